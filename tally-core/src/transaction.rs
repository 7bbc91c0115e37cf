//! Normalized transaction records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::digest::short_digest;

/// A single statement transaction after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Deterministic id, see [`Transaction::generate_id`]
    pub id: String,
    pub account_id: String,
    pub date: NaiveDate,
    /// Description exactly as printed on the statement
    pub description: String,
    /// Negative = money out, positive = money in.
    pub amount: Decimal,
    /// Running balance after this transaction, when the statement prints one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    /// Bank-provided reference id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Transaction {
    pub fn new(
        account_id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        let account_id = account_id.into();
        let description = description.into();
        let id = Self::generate_id(&account_id, date, &description, amount);
        Self {
            id,
            account_id,
            date,
            description,
            amount,
            balance: None,
            external_ref: None,
            category: None,
        }
    }

    pub fn with_balance(mut self, balance: Option<Decimal>) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_external_ref(mut self, external_ref: Option<String>) -> Self {
        self.external_ref = external_ref;
        self
    }

    /// Id derived from the same fields that identify a duplicate, so two
    /// renderings of one transaction get the same id.
    pub fn generate_id(account_id: &str, date: NaiveDate, description: &str, amount: Decimal) -> String {
        short_digest(&format!(
            "{}|{}|{}|{}",
            account_id,
            date,
            normalize_description(description),
            amount.normalize()
        ))
    }

    /// Key used for duplicate detection within one account.
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey::new(self.date, self.amount, &self.description)
    }

    pub fn is_debit(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_credit(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }
}

/// (date, amount, normalized description)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

impl DedupKey {
    pub fn new(date: NaiveDate, amount: Decimal, description: &str) -> Self {
        Self {
            date,
            // 15.0 and 15.00 compare equal but hash differently without this
            amount: amount.normalize(),
            description: normalize_description(description),
        }
    }
}

/// Lowercase and drop all whitespace.
pub fn normalize_description(description: &str) -> String {
    description
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
