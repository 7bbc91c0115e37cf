use rust_decimal::Decimal;
use tally_core::Bank;
use thiserror::Error;

/// Document-level failures. Per-line problems are [`crate::LineWarning`]s instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported bank format for {bank}: {reason}")]
    UnsupportedBankFormat { bank: Bank, reason: String },

    #[error("unparseable document {document}: {reason}")]
    UnparseableDocument { document: String, reason: String },

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// The statement prints an account number that does not belong to the
    /// target account.
    #[error("{document} is a statement for account {found}, not {expected}")]
    AccountMismatch {
        document: String,
        expected: String,
        found: String,
    },

    #[error(
        "balance mismatch: opening {opening} + transactions = {computed}, statement closes at {closing}"
    )]
    BalanceMismatch {
        opening: Decimal,
        closing: Decimal,
        computed: Decimal,
    },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IngestError {
    pub(crate) fn unparseable(document: &str, reason: impl Into<String>) -> Self {
        IngestError::UnparseableDocument {
            document: document.to_string(),
            reason: reason.into(),
        }
    }
}
