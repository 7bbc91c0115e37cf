//! Duplicate detection within one account.

use std::collections::HashSet;

use tally_core::{DedupKey, Transaction};

/// Tracks what is already known for an account: stored transactions plus
/// whatever the current batch has admitted so far.
///
/// A transaction is a duplicate when its (date, amount, normalized description)
/// key is known, or when it carries an external reference that is known.
#[derive(Debug, Default)]
pub struct Deduplicator {
    keys: HashSet<DedupKey>,
    refs: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_existing<'a>(existing: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut dedup = Self::new();
        for txn in existing {
            dedup.remember(txn);
        }
        dedup
    }

    pub fn is_duplicate(&self, txn: &Transaction) -> bool {
        self.keys.contains(&txn.dedup_key())
            || txn
                .external_ref
                .as_deref()
                .is_some_and(|r| self.refs.contains(&normalize_ref(r)))
    }

    /// Record `txn` unless it is a duplicate. Returns whether it was new.
    pub fn admit(&mut self, txn: &Transaction) -> bool {
        if self.is_duplicate(txn) {
            return false;
        }
        self.remember(txn);
        true
    }

    fn remember(&mut self, txn: &Transaction) {
        self.keys.insert(txn.dedup_key());
        if let Some(r) = txn.external_ref.as_deref() {
            self.refs.insert(normalize_ref(r));
        }
    }
}

fn normalize_ref(r: &str) -> String {
    r.trim().to_ascii_uppercase()
}
