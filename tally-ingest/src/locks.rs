//! Per-account mutual exclusion for ingestion.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};

/// Keyed lock: at most one holder per account id, any number of accounts at once.
#[derive(Debug, Default)]
pub struct AccountLocks {
    busy: Mutex<HashSet<String>>,
    released: Condvar,
}

/// Held for the length of one ingestion; dropping it frees the account.
#[derive(Debug)]
pub struct AccountGuard<'a> {
    locks: &'a AccountLocks,
    account_id: String,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `account_id` is free, then claim it.
    pub fn acquire(&self, account_id: &str) -> AccountGuard<'_> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        while busy.contains(account_id) {
            busy = self
                .released
                .wait(busy)
                .unwrap_or_else(PoisonError::into_inner);
        }
        busy.insert(account_id.to_string());
        AccountGuard {
            locks: self,
            account_id: account_id.to_string(),
        }
    }

    pub fn is_locked(&self, account_id: &str) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(account_id)
    }
}

impl AccountGuard<'_> {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl Drop for AccountGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self.locks.busy.lock().unwrap_or_else(PoisonError::into_inner);
        busy.remove(&self.account_id);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_guard_releases_on_drop() {
        let locks = AccountLocks::new();
        {
            let guard = locks.acquire("a");
            assert_eq!(guard.account_id(), "a");
            assert!(locks.is_locked("a"));
            assert!(!locks.is_locked("b"));
        }
        assert!(!locks.is_locked("a"));
    }

    #[test]
    fn test_same_account_is_serialized() {
        let locks = AccountLocks::new();
        let inside = AtomicUsize::new(0);
        let max_inside = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    let _guard = locks.acquire("acct");
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(10));
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_different_accounts_do_not_block() {
        let locks = AccountLocks::new();
        let _a = locks.acquire("a");
        // Would deadlock if accounts shared one lock.
        let _b = locks.acquire("b");
        assert!(locks.is_locked("a") && locks.is_locked("b"));
    }
}
