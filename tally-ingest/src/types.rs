use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use tally_core::{StatementPeriod, Transaction};

/// An uploaded statement: its raw bytes plus where it came from.
#[derive(Debug, Clone)]
pub struct StatementDocument {
    /// Path or other reference, used in messages only
    pub source: String,
    pub bytes: Vec<u8>,
}

impl StatementDocument {
    pub fn new(source: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source: source.into(),
            bytes,
        }
    }

    /// Already-extracted statement text.
    pub fn from_text(source: impl Into<String>, text: &str) -> Self {
        Self::new(source, text.as_bytes().to_vec())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
    }
}

/// One raw record a layout rule set recognized, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// 1-based line number in the extracted text
    pub line: usize,
    pub text: String,
}

/// Fields of a line item that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub balance: Option<Decimal>,
    pub external_ref: Option<String>,
}

/// A line item and what came of validating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub item: LineItem,
    pub outcome: std::result::Result<RawTransaction, String>,
}

/// Everything a rule set pulled out of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStatement {
    pub period: Option<StatementPeriod>,
    pub account_number: Option<String>,
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
    pub rows: Vec<ParsedRow>,
}

/// A line that could not be turned into a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineWarning {
    pub line: usize,
    pub reason: String,
}

/// The transactions extracted from one upload, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionBatch {
    pub source: String,
    pub account_id: String,
    /// In statement order
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<LineWarning>,
}

/// Opening balance plus valid amounts, compared against the printed closing balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReconciliation {
    pub opening: Decimal,
    pub closing: Decimal,
    pub computed_closing: Decimal,
}

impl BalanceReconciliation {
    pub fn is_balanced(&self) -> bool {
        self.computed_closing == self.closing
    }

    pub fn difference(&self) -> Decimal {
        self.closing - self.computed_closing
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub source: String,
    pub account_id: String,
    /// Net-new transactions in statement order
    pub accepted: Vec<Transaction>,
    pub skipped_duplicates: usize,
    pub warnings: Vec<LineWarning>,
    /// Line items the rule set recognized; equals accepted + skipped + warnings
    pub line_items: usize,
    pub reconciliation: Option<BalanceReconciliation>,
}

impl IngestionResult {
    /// False only when the statement printed both balances and they disagree.
    pub fn is_balanced(&self) -> bool {
        self.reconciliation.is_none_or(|r| r.is_balanced())
    }
}
