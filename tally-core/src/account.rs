//! Account and bank types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::category::{Category, default_categories, find_category};
use crate::digest::short_digest;

/// Banks a statement can come from.
///
/// Knowing a bank does not mean its statements can be parsed; that depends on
/// which layout rule sets are registered with the ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bank {
    #[serde(rename = "chase")]
    Chase,
    #[serde(rename = "marcus")]
    Marcus,
    #[serde(rename = "coinbase")]
    Coinbase,
    #[serde(rename = "webull")]
    Webull,
}

impl Bank {
    pub const ALL: [Bank; 4] = [Bank::Chase, Bank::Marcus, Bank::Coinbase, Bank::Webull];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bank::Chase => "chase",
            Bank::Marcus => "marcus",
            Bank::Coinbase => "coinbase",
            Bank::Webull => "webull",
        }
    }

    /// Human-readable name, as printed on statements.
    pub fn display_name(&self) -> &'static str {
        match self {
            Bank::Chase => "Chase",
            Bank::Marcus => "Marcus by Goldman Sachs",
            Bank::Coinbase => "Coinbase",
            Bank::Webull => "Webull",
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Bank {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Bank::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("unknown bank: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountKind {
    #[serde(rename = "debit")]
    Debit,
    #[serde(rename = "credit")]
    Credit,
    #[serde(rename = "saving")]
    Saving,
    #[serde(rename = "investment")]
    Investment,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Debit => "debit",
            AccountKind::Credit => "credit",
            AccountKind::Saving => "saving",
            AccountKind::Investment => "investment",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debit" | "checking" => Ok(AccountKind::Debit),
            "credit" | "credit-card" => Ok(AccountKind::Credit),
            "saving" | "savings" => Ok(AccountKind::Saving),
            "investment" => Ok(AccountKind::Investment),
            other => anyhow::bail!("unknown account kind: {other}"),
        }
    }
}

/// A bank account that statements are ingested into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub bank: Bank,
    pub kind: AccountKind,
    /// ISO 4217 code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Empty means the default category list applies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<Category>,
}

pub fn default_currency() -> String {
    "USD".to_string()
}

impl Account {
    pub fn new(id: impl Into<String>, bank: Bank, kind: AccountKind) -> Self {
        Self {
            id: id.into(),
            bank,
            kind,
            currency: default_currency(),
            categories: Vec::new(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into().to_ascii_uppercase();
        self
    }

    /// The categories transactions in this account can be filed under.
    pub fn categories_or_default(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            default_categories()
        } else {
            self.categories.clone()
        }
    }

    pub fn find_category(&self, name: &str) -> Option<Category> {
        find_category(&self.categories_or_default(), name).cloned()
    }

    /// Stable id for an account, derived from the bank and the account number
    /// so the raw number is never stored. Separators in the number are ignored.
    pub fn derive_id(bank: Bank, account_number: &str) -> String {
        let number: String = account_number
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        short_digest(&format!("{}:{}", bank.as_str(), number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_from_str_is_case_insensitive() {
        assert_eq!("Chase".parse::<Bank>().unwrap(), Bank::Chase);
        assert_eq!(" webull ".parse::<Bank>().unwrap(), Bank::Webull);
        assert!("wells".parse::<Bank>().is_err());
    }

    #[test]
    fn test_account_kind_aliases() {
        assert_eq!("checking".parse::<AccountKind>().unwrap(), AccountKind::Debit);
        assert_eq!("Savings".parse::<AccountKind>().unwrap(), AccountKind::Saving);
    }

    #[test]
    fn test_derive_id_is_stable_and_hides_number() {
        let a = Account::derive_id(Bank::Chase, "000000123456789");
        let b = Account::derive_id(Bank::Chase, " 000000123456789 ");
        assert_eq!(a, b);
        assert_eq!(a, Account::derive_id(Bank::Chase, "0000 0012-3456789"));
        assert_eq!(a.len(), 16);
        assert!(!a.contains("123456789"));
        assert_ne!(a, Account::derive_id(Bank::Marcus, "000000123456789"));
    }

    #[test]
    fn test_account_serde_defaults_currency() {
        let acct: Account =
            serde_json::from_str(r#"{"id":"a1","bank":"chase","kind":"debit"}"#).unwrap();
        assert_eq!(acct.currency, "USD");
        assert_eq!(acct.bank, Bank::Chase);
        assert!(acct.categories.is_empty());
    }

    #[test]
    fn test_custom_categories_replace_defaults() {
        let mut acct = Account::new("a1", Bank::Coinbase, AccountKind::Investment);
        assert_eq!(acct.find_category("Groceries").unwrap().name, "groceries");

        acct.categories = vec![Category::new("staking", "Staking rewards")];
        assert_eq!(acct.find_category("STAKING").unwrap().description, "Staking rewards");
        assert!(acct.find_category("groceries").is_none());
        assert_eq!(acct.categories_or_default().len(), 1);
    }
}
