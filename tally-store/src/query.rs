use chrono::NaiveDate;

use tally_core::Transaction;

/// Filters for listing stored transactions. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub account_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<String>,
    pub uncategorized_only: bool,
}

impl TransactionQuery {
    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if self.account_id.as_deref().is_some_and(|a| a != txn.account_id) {
            return false;
        }
        if self.from.is_some_and(|from| txn.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| txn.date > to) {
            return false;
        }
        if self.uncategorized_only && txn.category.is_some() {
            return false;
        }
        match (&self.category, &txn.category) {
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn txn(day: u32) -> Transaction {
        Transaction::new(
            "acct",
            NaiveDate::from_ymd_opt(2025, 12, day).unwrap(),
            "Thing",
            Decimal::new(-100, 2),
        )
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let q = TransactionQuery::for_account("acct").between(
            NaiveDate::from_ymd_opt(2025, 12, 2),
            NaiveDate::from_ymd_opt(2025, 12, 4),
        );
        assert!(!q.matches(&txn(1)));
        assert!(q.matches(&txn(2)));
        assert!(q.matches(&txn(4)));
        assert!(!q.matches(&txn(5)));
    }

    #[test]
    fn test_account_and_category_filters() {
        let mut t = txn(1);
        assert!(!TransactionQuery::for_account("other").matches(&t));

        let q = TransactionQuery {
            category: Some("Dining".into()),
            ..TransactionQuery::default()
        };
        assert!(!q.matches(&t));
        t.category = Some("dining".into());
        assert!(q.matches(&t));

        let uncategorized = TransactionQuery {
            uncategorized_only: true,
            ..TransactionQuery::default()
        };
        assert!(!uncategorized.matches(&t));
    }
}
