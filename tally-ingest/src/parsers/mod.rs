//! Bank-specific layout rule sets and the registry that maps banks to them.

pub mod chase;

use anyhow::Result;
use std::collections::BTreeMap;

use tally_core::Bank;

use crate::types::ParsedStatement;

pub use chase::ChaseParser;

/// A layout rule set for one bank's statements.
pub trait StatementParser: Send + Sync {
    fn bank(&self) -> Bank;

    /// Whether the extracted text looks like this bank's layout.
    fn detect(&self, text: &str) -> bool;

    /// Split the text into line items and validate each one.
    ///
    /// Errors are reserved for document-level problems; a bad line becomes a
    /// failed [`crate::types::ParsedRow`].
    fn parse(&self, text: &str) -> Result<ParsedStatement>;
}

/// Bank to rule set, looked up at ingestion time.
pub struct ParserRegistry {
    parsers: BTreeMap<Bank, Box<dyn StatementParser>>,
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// Registry with every rule set that ships with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(ChaseParser);
        registry
    }

    /// Add or replace the rule set for `parser.bank()`.
    pub fn register(&mut self, parser: impl StatementParser + 'static) {
        self.parsers.insert(parser.bank(), Box::new(parser));
    }

    pub fn get(&self, bank: Bank) -> Option<&dyn StatementParser> {
        self.parsers.get(&bank).map(|p| p.as_ref())
    }

    pub fn supported_banks(&self) -> Vec<Bank> {
        self.parsers.keys().copied().collect()
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
