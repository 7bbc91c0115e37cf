//! Spending categories a transaction can be filed under.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

const DEFAULTS: [(&str, &str); 14] = [
    ("income", "Salary, wages, direct deposits, and other income"),
    ("transfer", "Transfers between accounts"),
    ("groceries", "Grocery stores and supermarkets"),
    ("dining", "Restaurants, cafes, and food delivery"),
    ("utilities", "Electric, gas, water, internet, and phone bills"),
    ("rent", "Rent and mortgage payments"),
    ("transportation", "Gas, public transit, rideshare, and parking"),
    ("entertainment", "Streaming services, movies, games, and events"),
    ("shopping", "Retail purchases, clothing, and electronics"),
    ("health", "Medical, dental, pharmacy, and fitness"),
    ("travel", "Flights, hotels, and travel expenses"),
    ("subscriptions", "Recurring subscription services"),
    ("fees", "Bank fees, service charges, and penalties"),
    ("other", "Transactions that don't fit other categories"),
];

pub fn default_categories() -> Vec<Category> {
    DEFAULTS
        .iter()
        .map(|(name, description)| Category::new(*name, *description))
        .collect()
}

/// Look up a category by name, ignoring case.
pub fn find_category<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    let name = name.trim();
    categories.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

/// Check a user-supplied category list: names are trimmed, lowercased,
/// non-empty and unique.
pub fn normalize_categories(categories: Vec<Category>) -> Result<Vec<Category>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(categories.len());
    for c in categories {
        let name = c.name.trim().to_lowercase();
        if name.is_empty() {
            bail!("category names must not be empty");
        }
        if !seen.insert(name.clone()) {
            bail!("duplicate category: {name}");
        }
        out.push(Category::new(name, c.description.trim()));
    }
    Ok(out)
}
