//! Calendar helpers for statements that print dates without a year.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive date range a statement covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("'{0}' is not a MM/DD date")]
    Malformed(String),
    #[error("{month:02}/{day:02} is not a valid calendar date")]
    NotACalendarDate { month: u32, day: u32 },
    #[error("{month:02}/{day:02} falls outside the statement period {start} to {end}")]
    OutsidePeriod {
        month: u32,
        day: u32,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl StatementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Resolve a year-less month/day against this period.
    ///
    /// The start year is tried first, then the end year when the period spans
    /// New Year.
    pub fn infer_date(&self, month: u32, day: u32) -> Result<NaiveDate, DateError> {
        let mut years = vec![self.start.year()];
        if self.end.year() != self.start.year() {
            years.push(self.end.year());
        }

        let mut any_valid = false;
        for year in years {
            if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day) {
                any_valid = true;
                if self.contains(candidate) {
                    return Ok(candidate);
                }
            }
        }

        if any_valid {
            Err(DateError::OutsidePeriod {
                month,
                day,
                start: self.start,
                end: self.end,
            })
        } else {
            Err(DateError::NotACalendarDate { month, day })
        }
    }

    /// Parse a `MM/DD` token and resolve it against this period.
    pub fn resolve_mm_dd(&self, token: &str) -> Result<NaiveDate, DateError> {
        let (month, day) = split_mm_dd(token).ok_or_else(|| DateError::Malformed(token.to_string()))?;
        self.infer_date(month, day)
    }
}

fn split_mm_dd(token: &str) -> Option<(u32, u32)> {
    let (m, d) = token.trim().split_once('/')?;
    Some((m.parse().ok()?, d.parse().ok()?))
}

/// Month number for an English month name or its three-letter abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    MONTHS
        .iter()
        .position(|m| *m == lower || (lower.len() == 3 && m.starts_with(&lower)))
        .map(|i| i as u32 + 1)
}
