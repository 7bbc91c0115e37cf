//! JSON-file storage for accounts and transactions.
//!
//! Layout under the data dir:
//!   accounts.json                  account id -> account
//!   accounts.lock                  held while accounts.json is rewritten
//!   transactions/<account_id>.json transactions in statement order
//!   transactions/<account_id>.lock held across read-modify-write of the above
//!
//! The `.lock` files carry OS file locks, so separate processes (two `tally
//! upload` runs, say) serialize on the same account.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use tally_core::{Account, Category, Transaction, normalize_categories};
use tally_ingest::{LedgerView, SinkGuard, TransactionSink};

use crate::query::TransactionQuery;

pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let txn_dir = root.join("transactions");
        fs::create_dir_all(&txn_dir).with_context(|| format!("create {}", txn_dir.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accounts_path(&self) -> PathBuf {
        self.root.join("accounts.json")
    }

    fn account_file(&self, account_id: &str, ext: &str) -> Result<PathBuf> {
        if account_id.is_empty()
            || !account_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("invalid account id: {account_id:?}");
        }
        Ok(self.root.join("transactions").join(format!("{account_id}.{ext}")))
    }

    fn transactions_path(&self, account_id: &str) -> Result<PathBuf> {
        self.account_file(account_id, "json")
    }

    /// Blocks until no other handle, in this process or another, holds the
    /// account's transaction file.
    pub fn lock_transactions(&self, account_id: &str) -> Result<File> {
        lock_exclusive(&self.account_file(account_id, "lock")?)
    }

    fn lock_accounts(&self) -> Result<File> {
        lock_exclusive(&self.root.join("accounts.lock"))
    }

    fn load_account_map(&self) -> Result<BTreeMap<String, Account>> {
        Ok(read_json(&self.accounts_path())?.unwrap_or_default())
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.load_account_map()?.into_values().collect())
    }

    pub fn account(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self.load_account_map()?.remove(account_id))
    }

    /// Insert or replace an account.
    pub fn save_account(&self, account: &Account) -> Result<()> {
        // Validates the id before anything is written.
        self.transactions_path(&account.id)?;

        let _lock = self.lock_accounts()?;
        let mut accounts = self.load_account_map()?;
        accounts.insert(account.id.clone(), account.clone());
        write_json(&self.accounts_path(), &accounts)
    }

    /// Replace the account's category list. An empty list restores the defaults.
    pub fn set_categories(&self, account_id: &str, categories: Vec<Category>) -> Result<Account> {
        let categories = normalize_categories(categories)?;

        let _lock = self.lock_accounts()?;
        let mut accounts = self.load_account_map()?;
        let Some(account) = accounts.get_mut(account_id) else {
            bail!("unknown account: {account_id}");
        };
        account.categories = categories;
        let updated = account.clone();
        write_json(&self.accounts_path(), &accounts)?;
        debug!("account {account_id}: {} categories", updated.categories.len());
        Ok(updated)
    }

    pub fn transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        Ok(read_json(&self.transactions_path(account_id)?)?.unwrap_or_default())
    }

    /// Append transactions whose ids are not stored yet. Returns how many were added.
    pub fn append_transactions(&self, account_id: &str, transactions: &[Transaction]) -> Result<usize> {
        let _lock = self.lock_transactions(account_id)?;
        self.append_locked(account_id, transactions)
    }

    fn append_locked(&self, account_id: &str, transactions: &[Transaction]) -> Result<usize> {
        let path = self.transactions_path(account_id)?;
        if let Some(t) = transactions.iter().find(|t| t.account_id != account_id) {
            bail!("transaction {} belongs to account {}, not {account_id}", t.id, t.account_id);
        }

        let mut stored: Vec<Transaction> = read_json(&path)?.unwrap_or_default();
        let mut ids: HashSet<String> = stored.iter().map(|t| t.id.clone()).collect();

        let before = stored.len();
        for t in transactions {
            if ids.insert(t.id.clone()) {
                stored.push(t.clone());
            }
        }
        let added = stored.len() - before;
        if added > 0 {
            write_json(&path, &stored)?;
        }
        debug!("account {account_id}: {added} added, {} total", stored.len());
        Ok(added)
    }

    /// Stored transactions matching `query`, accounts in id order, each
    /// account's transactions in stored order.
    pub fn query(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let account_ids: Vec<String> = match &query.account_id {
            Some(id) => vec![id.clone()],
            None => self.load_account_map()?.into_keys().collect(),
        };

        let mut out = Vec::new();
        for id in account_ids {
            out.extend(self.transactions(&id)?.into_iter().filter(|t| query.matches(t)));
        }
        Ok(out)
    }

    /// Set the category of one transaction. The category must be one the
    /// account allows. Returns false when the transaction does not exist.
    pub fn categorize(&self, account_id: &str, transaction_id: &str, category: &str) -> Result<bool> {
        let Some(account) = self.account(account_id)? else {
            bail!("unknown account: {account_id}");
        };
        let Some(category) = account.find_category(category) else {
            bail!("category {category:?} is not configured for account {account_id}");
        };
        let path = self.transactions_path(account_id)?;

        let _lock = self.lock_transactions(account_id)?;
        let mut stored: Vec<Transaction> = read_json(&path)?.unwrap_or_default();
        let Some(txn) = stored.iter_mut().find(|t| t.id == transaction_id) else {
            return Ok(false);
        };
        txn.category = Some(category.name);
        write_json(&path, &stored)?;
        Ok(true)
    }
}

impl LedgerView for JsonStore {
    fn account(&self, account_id: &str) -> Result<Option<Account>> {
        JsonStore::account(self, account_id)
    }

    fn transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        JsonStore::transactions(self, account_id)
    }
}

impl TransactionSink for JsonStore {
    fn persist(&self, account_id: &str, transactions: &[Transaction]) -> Result<usize> {
        self.append_locked(account_id, transactions)
    }

    fn lock_account(&self, account_id: &str) -> Result<SinkGuard> {
        Ok(SinkGuard::hold(self.lock_transactions(account_id)?))
    }
}

// The lock is released when the returned file is closed.
fn lock_exclusive(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("lock {}", path.display()))?;
    Ok(file)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if s.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    Ok(Some(value))
}

/// Write to a uniquely named temp file in the same directory, then rename it
/// over `path`, so readers never see half a file.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).with_context(|| format!("create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.flush()?;
    tmp.persist(path)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tally_core::{AccountKind, Bank};
    use tally_ingest::StatementIngestor;

    fn txn(account: &str, day: u32, desc: &str) -> Transaction {
        Transaction::new(
            account,
            NaiveDate::from_ymd_opt(2025, 12, day).unwrap(),
            desc,
            Decimal::new(-1000, 2),
        )
    }

    #[test]
    fn test_accounts_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.list_accounts().unwrap().is_empty());

        let acct = Account::new("b-2", Bank::Chase, AccountKind::Debit);
        store.save_account(&acct).unwrap();
        store
            .save_account(&Account::new("a-1", Bank::Marcus, AccountKind::Saving).with_currency("usd"))
            .unwrap();

        let ids: Vec<_> = store.list_accounts().unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a-1", "b-2"]);
        assert_eq!(store.account("b-2").unwrap(), Some(acct));
        assert_eq!(store.account("a-1").unwrap().unwrap().currency, "USD");
        assert_eq!(store.account("zzz").unwrap(), None);
    }

    #[test]
    fn test_append_skips_known_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();

        let a = txn("acct", 1, "One");
        let b = txn("acct", 2, "Two");
        assert_eq!(store.append_transactions("acct", &[a.clone(), b.clone()]).unwrap(), 2);
        assert_eq!(store.append_transactions("acct", &[b, txn("acct", 3, "Three")]).unwrap(), 1);

        let stored = store.transactions("acct").unwrap();
        let descs: Vec<_> = stored.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["One", "Two", "Three"]);

        let mut files: Vec<_> = fs::read_dir(dir.path().join("transactions"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();
        assert_eq!(files, vec!["acct.json", "acct.lock"]);
    }

    #[test]
    fn test_account_lock_excludes_other_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let guard = store.lock_transactions("acct").unwrap();

        let other = File::open(dir.path().join("transactions/acct.lock")).unwrap();
        assert!(other.try_lock_exclusive().is_err());
        drop(guard);
        assert!(other.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_upload_waits_for_account_lock() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let account = Account::new(Account::derive_id(Bank::Chase, "42"), Bank::Chase, AccountKind::Debit);
        store.save_account(&account).unwrap();
        let text = "JPMorgan Chase\nNovember 25, 2025 through December 19, 2025\nAccount Number: 42\n\
                    TRANSACTION DETAIL\n 12/03  Coffee Shop  -4.50\n";
        let document = tally_ingest::StatementDocument::from_text("stmt.txt", text);

        let held = store.lock_transactions(&account.id).unwrap();
        std::thread::scope(|s| {
            let upload = s.spawn(|| {
                let other = JsonStore::open(dir.path()).unwrap();
                StatementIngestor::default().upload(&document, &account.id, &other).unwrap()
            });
            std::thread::sleep(std::time::Duration::from_millis(100));
            assert!(!upload.is_finished());
            assert!(store.transactions(&account.id).unwrap().is_empty());

            drop(held);
            assert_eq!(upload.join().unwrap().accepted.len(), 1);
        });
        assert_eq!(store.transactions(&account.id).unwrap().len(), 1);
    }

    #[test]
    fn test_append_rejects_foreign_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let err = store.append_transactions("acct", &[txn("other", 1, "One")]).unwrap_err();
        assert!(err.to_string().contains("belongs to account other"));
        assert!(store.transactions("acct").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_like_account_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.transactions("../etc").is_err());
        assert!(store.save_account(&Account::new("a/b", Bank::Chase, AccountKind::Debit)).is_err());
    }

    #[test]
    fn test_categorize() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.save_account(&Account::new("acct", Bank::Chase, AccountKind::Debit)).unwrap();
        let t = txn("acct", 1, "Grocer");
        store.append_transactions("acct", &[t.clone()]).unwrap();

        assert!(store.categorize("acct", &t.id, "Groceries").unwrap());
        assert_eq!(store.transactions("acct").unwrap()[0].category.as_deref(), Some("groceries"));

        assert!(!store.categorize("acct", "missing", "groceries").unwrap());
        assert!(store.categorize("acct", &t.id, "crypto").is_err());
        assert!(store.categorize("nope", &t.id, "groceries").is_err());
    }

    #[test]
    fn test_account_categories_govern_categorize() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.save_account(&Account::new("acct", Bank::Coinbase, AccountKind::Investment)).unwrap();
        let t = txn("acct", 1, "Staking reward");
        store.append_transactions("acct", &[t.clone()]).unwrap();

        let updated = store
            .set_categories("acct", vec![Category::new("Staking", "Staking rewards")])
            .unwrap();
        assert_eq!(updated.categories, vec![Category::new("staking", "Staking rewards")]);
        assert_eq!(store.account("acct").unwrap().unwrap().categories.len(), 1);

        assert!(store.categorize("acct", &t.id, "groceries").is_err());
        assert!(store.categorize("acct", &t.id, "staking").unwrap());

        // An empty list falls back to the defaults again.
        store.set_categories("acct", Vec::new()).unwrap();
        assert!(store.categorize("acct", &t.id, "groceries").unwrap());

        assert!(store.set_categories("missing", Vec::new()).is_err());
        assert!(
            store
                .set_categories("acct", vec![Category::new("a", ""), Category::new("A", "")])
                .is_err()
        );
    }

    #[test]
    fn test_query_across_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.save_account(&Account::new("a", Bank::Chase, AccountKind::Debit)).unwrap();
        store.save_account(&Account::new("b", Bank::Chase, AccountKind::Credit)).unwrap();
        store.append_transactions("a", &[txn("a", 1, "A1"), txn("a", 5, "A5")]).unwrap();
        store.append_transactions("b", &[txn("b", 3, "B3")]).unwrap();

        let all = store.query(&TransactionQuery::default()).unwrap();
        assert_eq!(all.len(), 3);

        let q = TransactionQuery::default().between(NaiveDate::from_ymd_opt(2025, 12, 2), None);
        let descs: Vec<_> = store.query(&q).unwrap().into_iter().map(|t| t.description).collect();
        assert_eq!(descs, vec!["A5", "B3"]);
    }
}
