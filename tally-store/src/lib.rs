//! tally-store: local JSON storage for accounts and ingested transactions

pub mod export;
pub mod query;
pub mod store;

pub use export::write_csv;
pub use query::TransactionQuery;
pub use store::JsonStore;
