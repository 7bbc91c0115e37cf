use std::path::Path;
use std::process::Command;

// Sets TALLY_BUILD_SHA for `tally --version`. A value already in the
// environment wins, so source tarballs without .git can still stamp a build.
fn main() {
    println!("cargo:rerun-if-env-changed=TALLY_BUILD_SHA");

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
    let workspace = Path::new(&manifest_dir).join("..");
    let head = workspace.join(".git/HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let sha = std::env::var("TALLY_BUILD_SHA")
        .ok()
        .or_else(|| git_describe(&workspace))
        .unwrap_or_else(|| "unknown".into());
    println!("cargo:rustc-env=TALLY_BUILD_SHA={sha}");
}

/// Short commit id, suffixed with `-dirty` when the tree has local changes.
fn git_describe(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8(out.stdout).ok()?.trim().to_string();
    (!sha.is_empty()).then_some(sha)
}
