use sha2::{Digest, Sha256};

/// First 16 hex chars of the SHA-256 of `input`.
pub fn short_digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..16].to_string()
}
