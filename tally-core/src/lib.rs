//! tally-core: domain types shared by the ingestion, storage and CLI crates

pub mod account;
pub mod category;
pub mod dates;
pub mod digest;
pub mod money;
pub mod transaction;

pub use account::{Account, AccountKind, Bank};
pub use category::{Category, default_categories, find_category, normalize_categories};
pub use dates::{DateError, StatementPeriod};
pub use money::parse_amount;
pub use transaction::{DedupKey, Transaction, normalize_description};
