use std::fmt::Write;
use std::thread;

use tally_core::{Account, AccountKind, Bank};
use tally_ingest::{StatementDocument, StatementIngestor};
use tally_store::JsonStore;

const ACCOUNT_NUMBER: &str = "000000123456789";

/// A Chase statement with `rows` distinct December purchases.
fn statement(tag: &str, rows: usize) -> StatementDocument {
    let mut text = format!(
        "JPMorgan Chase Bank, N.A.\n\
         November 25, 2025 through December 19, 2025\n\
         Account Number: {ACCOUNT_NUMBER}\n\
         TRANSACTION DETAIL\n"
    );
    for i in 0..rows {
        writeln!(
            text,
            "       12/{:02}       Card Purchase {tag} {i}        -{}.{:02}",
            1 + i % 19,
            1 + i,
            i % 100
        )
        .unwrap();
    }
    StatementDocument::from_text(format!("{tag}.txt"), &text)
}

/// Each writer opens its own store and ingestor, the way separate `tally
/// upload` processes do.
#[test]
fn test_uploads_through_separate_handles_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let account = Account::new(
        Account::derive_id(Bank::Chase, ACCOUNT_NUMBER),
        Bank::Chase,
        AccountKind::Debit,
    );
    JsonStore::open(root).unwrap().save_account(&account).unwrap();
    let id = account.id.as_str();

    let rounds = 6;
    let rows = 150;
    for round in 0..rounds {
        thread::scope(|s| {
            for writer in ["alpha", "beta"] {
                s.spawn(move || {
                    let store = JsonStore::open(root).unwrap();
                    let result = StatementIngestor::default()
                        .upload(&statement(&format!("{writer}{round}"), rows), id, &store)
                        .unwrap();
                    assert_eq!(result.accepted.len(), rows);
                });
            }
        });
    }

    let stored = JsonStore::open(root).unwrap().transactions(id).unwrap();
    assert_eq!(stored.len(), rounds * 2 * rows);

    let leftovers: Vec<_> = std::fs::read_dir(root.join("transactions"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| !name.ends_with(".json") && !name.ends_with(".lock"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

/// The same statement uploaded concurrently through two handles is stored once.
#[test]
fn test_same_statement_from_two_handles_is_stored_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let account = Account::new(
        Account::derive_id(Bank::Chase, ACCOUNT_NUMBER),
        Bank::Chase,
        AccountKind::Debit,
    );
    JsonStore::open(root).unwrap().save_account(&account).unwrap();
    let id = account.id.as_str();

    let accepted: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(move || {
                    let store = JsonStore::open(root).unwrap();
                    StatementIngestor::default()
                        .upload(&statement("shared", 40), id, &store)
                        .unwrap()
                        .accepted
                        .len()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(accepted, 40);
    assert_eq!(JsonStore::open(root).unwrap().transactions(id).unwrap().len(), 40);
}
