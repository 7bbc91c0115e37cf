//! CSV export of stored transactions.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use tally_core::Transaction;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    account_id: &'a str,
    date: String,
    description: &'a str,
    amount: String,
    balance: Option<String>,
    external_ref: Option<&'a str>,
    category: Option<&'a str>,
}

/// Write `transactions` as CSV with a header row.
pub fn write_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for t in transactions {
        wtr.serialize(CsvRow {
            id: &t.id,
            account_id: &t.account_id,
            date: t.date.to_string(),
            description: &t.description,
            amount: t.amount.to_string(),
            balance: t.balance.map(|b| b.to_string()),
            external_ref: t.external_ref.as_deref(),
            category: t.category.as_deref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
