//! tally-ingest: bank statement ingestion, bank-specific layout rule sets and
//! duplicate detection.

pub mod dedup;
pub mod document;
pub mod error;
pub mod ingestor;
pub mod locks;
pub mod parsers;
pub mod types;

pub use dedup::Deduplicator;
pub use document::{DocumentReader, PdfTextReader};
pub use error::IngestError;
pub use ingestor::{IngestOptions, LedgerView, SinkGuard, StatementIngestor, TransactionSink};
pub use locks::{AccountGuard, AccountLocks};
pub use parsers::{ChaseParser, ParserRegistry, StatementParser};
pub use types::{
    BalanceReconciliation, IngestionBatch, IngestionResult, LineItem, LineWarning, ParsedRow,
    ParsedStatement, RawTransaction, StatementDocument,
};
