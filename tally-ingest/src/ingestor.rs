//! Statement ingestion: document in, validated and deduplicated transactions out.

use anyhow::Result;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::any::Any;

use tally_core::{Account, Transaction};

use crate::dedup::Deduplicator;
use crate::document::{DocumentReader, PdfTextReader};
use crate::error::IngestError;
use crate::locks::AccountLocks;
use crate::parsers::ParserRegistry;
use crate::types::{
    BalanceReconciliation, IngestionBatch, IngestionResult, LineWarning, ParsedStatement,
    StatementDocument,
};

/// Read access to stored state, used to resolve the account and to deduplicate.
pub trait LedgerView {
    fn account(&self, account_id: &str) -> Result<Option<Account>>;

    /// Every stored transaction for the account.
    fn transactions(&self, account_id: &str) -> Result<Vec<Transaction>>;
}

/// Where accepted transactions go.
pub trait TransactionSink {
    /// Persist the whole slice or nothing. Returns how many were written.
    ///
    /// Called with the guard from [`Self::lock_account`] held.
    fn persist(&self, account_id: &str, transactions: &[Transaction]) -> Result<usize>;

    /// Exclusive hold on the account's stored transactions for writers that do
    /// not share this process. Held from the duplicate check until `persist`
    /// returns.
    fn lock_account(&self, _account_id: &str) -> Result<SinkGuard> {
        Ok(SinkGuard::none())
    }
}

/// Keeps whatever a [`TransactionSink`] uses as a lock alive until dropped.
pub struct SinkGuard {
    _held: Option<Box<dyn Any + Send>>,
}

impl SinkGuard {
    pub fn none() -> Self {
        Self { _held: None }
    }

    pub fn hold(lock: impl Any + Send) -> Self {
        Self {
            _held: Some(Box::new(lock)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Refuse to persist a batch whose balances do not reconcile
    pub require_balanced: bool,
}

pub struct StatementIngestor {
    registry: ParserRegistry,
    reader: Box<dyn DocumentReader>,
    locks: AccountLocks,
    options: IngestOptions,
}

impl StatementIngestor {
    pub fn new(registry: ParserRegistry) -> Self {
        Self {
            registry,
            reader: Box::new(PdfTextReader),
            locks: AccountLocks::new(),
            options: IngestOptions::default(),
        }
    }

    pub fn with_reader(mut self, reader: impl DocumentReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn locks(&self) -> &AccountLocks {
        &self.locks
    }

    /// Extract, validate and deduplicate one statement for one account.
    ///
    /// Nothing is written; the caller persists `accepted`.
    pub fn ingest<L>(
        &self,
        document: &StatementDocument,
        account_id: &str,
        ledger: &L,
    ) -> Result<IngestionResult, IngestError>
    where
        L: LedgerView + ?Sized,
    {
        let _guard = self.locks.acquire(account_id);
        self.ingest_locked(document, account_id, ledger)
    }

    /// [`Self::ingest`], then hand the accepted transactions to `store`, with the
    /// account locked across the read and the write, both in this process and
    /// through [`TransactionSink::lock_account`].
    pub fn upload<S>(
        &self,
        document: &StatementDocument,
        account_id: &str,
        store: &S,
    ) -> Result<IngestionResult, IngestError>
    where
        S: LedgerView + TransactionSink + ?Sized,
    {
        let _guard = self.locks.acquire(account_id);
        if store.account(account_id)?.is_none() {
            return Err(IngestError::UnknownAccount(account_id.to_string()));
        }
        let _held = store.lock_account(account_id)?;
        let result = self.ingest_locked(document, account_id, store)?;

        if self.options.require_balanced {
            if let Some(r) = result.reconciliation.filter(|r| !r.is_balanced()) {
                return Err(IngestError::BalanceMismatch {
                    opening: r.opening,
                    closing: r.closing,
                    computed: r.computed_closing,
                });
            }
        }

        let written = store.persist(account_id, &result.accepted)?;
        info!(
            "persisted {written} of {} accepted transactions for account {account_id}",
            result.accepted.len()
        );
        Ok(result)
    }

    fn ingest_locked<L>(
        &self,
        document: &StatementDocument,
        account_id: &str,
        ledger: &L,
    ) -> Result<IngestionResult, IngestError>
    where
        L: LedgerView + ?Sized,
    {
        let account = ledger
            .account(account_id)?
            .ok_or_else(|| IngestError::UnknownAccount(account_id.to_string()))?;

        let parser = self
            .registry
            .get(account.bank)
            .ok_or_else(|| IngestError::UnsupportedBankFormat {
                bank: account.bank,
                reason: "no statement layout registered".to_string(),
            })?;

        let text = self
            .reader
            .read_text(document)
            .map_err(|e| IngestError::unparseable(&document.source, format!("{e:#}")))?;
        if text.trim().is_empty() {
            return Err(IngestError::unparseable(&document.source, "no text content"));
        }

        if !parser.detect(&text) {
            return Err(IngestError::UnsupportedBankFormat {
                bank: account.bank,
                reason: format!("{} does not look like a {} statement", document.source, account.bank.display_name()),
            });
        }

        let parsed = parser
            .parse(&text)
            .map_err(|e| IngestError::unparseable(&document.source, format!("{e:#}")))?;
        if parsed.rows.is_empty() {
            return Err(IngestError::unparseable(&document.source, "no line items found"));
        }
        if let Some(number) = &parsed.account_number {
            let found = Account::derive_id(account.bank, number);
            if found != account.id {
                return Err(IngestError::AccountMismatch {
                    document: document.source.clone(),
                    expected: account.id.clone(),
                    found,
                });
            }
        }

        let line_items = parsed.rows.len();
        let reconciliation = reconcile(&parsed);
        let batch = build_batch(document, &account, parsed);

        let existing = ledger.transactions(account_id)?;
        let mut dedup = Deduplicator::from_existing(&existing);

        let mut accepted = Vec::with_capacity(batch.transactions.len());
        let mut skipped_duplicates = 0;
        for txn in batch.transactions {
            if dedup.admit(&txn) {
                accepted.push(txn);
            } else {
                debug!("duplicate skipped: {} {} {}", txn.date, txn.amount, txn.description);
                skipped_duplicates += 1;
            }
        }

        info!(
            "ingested {}: {} line items, {} accepted, {} duplicates, {} warnings",
            batch.source,
            line_items,
            accepted.len(),
            skipped_duplicates,
            batch.warnings.len()
        );
        if let Some(r) = reconciliation.filter(|r| !r.is_balanced()) {
            warn!(
                "{} does not reconcile: opening {} + transactions = {}, closing {}",
                batch.source, r.opening, r.computed_closing, r.closing
            );
        }

        Ok(IngestionResult {
            source: batch.source,
            account_id: batch.account_id,
            accepted,
            skipped_duplicates,
            warnings: batch.warnings,
            line_items,
            reconciliation,
        })
    }
}

impl Default for StatementIngestor {
    fn default() -> Self {
        Self::new(ParserRegistry::builtin())
    }
}

fn build_batch(document: &StatementDocument, account: &Account, parsed: ParsedStatement) -> IngestionBatch {
    let mut transactions = Vec::new();
    let mut warnings = Vec::new();

    for row in parsed.rows {
        match row.outcome {
            Ok(raw) => transactions.push(
                Transaction::new(&account.id, raw.date, raw.description, raw.amount)
                    .with_balance(raw.balance)
                    .with_external_ref(raw.external_ref),
            ),
            Err(reason) => {
                warn!("{} line {}: {} ({})", document.source, row.item.line, reason, row.item.text);
                warnings.push(LineWarning {
                    line: row.item.line,
                    reason,
                });
            }
        }
    }

    IngestionBatch {
        source: document.source.clone(),
        account_id: account.id.clone(),
        transactions,
        warnings,
    }
}

fn reconcile(parsed: &ParsedStatement) -> Option<BalanceReconciliation> {
    let opening = parsed.opening_balance?;
    let closing = parsed.closing_balance?;
    let total: Decimal = parsed
        .rows
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok())
        .map(|t| t.amount)
        .sum();
    Some(BalanceReconciliation {
        opening,
        closing,
        computed_closing: opening + total,
    })
}
