//! Chase checking statement layout (extracted PDF text).
//!
//! Expected text:
//!   November 25, 2025 through December 19, 2025
//!   Account Number: 000000123456789
//!   TRANSACTION DETAIL
//!          DATE        DESCRIPTION                                     AMOUNT     BALANCE
//!                      Beginning Balance                                          $68.70
//!          11/26       Discover     E-Payment 8148   Web ID: ...       -15.00      53.70
//!                      Ending Balance                                            $153.70
//!
//! Rows carry MM/DD only; the year comes from the statement period.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use log::debug;
use regex::Regex;
use rust_decimal::Decimal;

use tally_core::dates::month_from_name;
use tally_core::{Bank, StatementPeriod, parse_amount};

use super::StatementParser;
use crate::types::{LineItem, ParsedRow, ParsedStatement, RawTransaction};

#[derive(Debug, Default, Clone, Copy)]
pub struct ChaseParser;

impl StatementParser for ChaseParser {
    fn bank(&self) -> Bank {
        Bank::Chase
    }

    fn detect(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        lower.contains("jpmorgan chase") || lower.contains("chase.com")
    }

    fn parse(&self, text: &str) -> Result<ParsedStatement> {
        let text = repair_page_markers(text)?;

        let period = parse_period(&text)?;
        debug!("chase statement period {} to {}", period.start, period.end);

        let opening_balance = find_balance(&text, "Beginning|Opening|Starting")?;
        let closing_balance = find_balance(&text, "Ending|Closing|Final")?;

        let account_re = Regex::new(r"(?i)Account\s*Number[:\s]*(\d[\d -]*\d)")?;
        let account_number = account_re
            .captures(&text)
            .map(|c| c[1].chars().filter(char::is_ascii_digit).collect::<String>());

        Ok(ParsedStatement {
            period: Some(period),
            account_number,
            opening_balance,
            closing_balance,
            rows: parse_rows(&text, &period)?,
        })
    }
}

/// Page breaks in Chase PDFs leave `*start*` / `*end*` markers that swallow the
/// first digit of the next row's date, e.g. `*end*transac1tion detail2/01`
/// stands for `12/01`.
fn repair_page_markers(text: &str) -> Result<String> {
    let marker_re = Regex::new(r"\*(?:start|end)\*\w*?(\d)\w*\s*detail(\d)")?;
    Ok(marker_re.replace_all(text, "${1}${2}").into_owned())
}

fn parse_period(text: &str) -> Result<StatementPeriod> {
    let period_re = Regex::new(
        r"(?i)([A-Za-z]+)\s+(\d{1,2}),\s*(\d{4})\s*through\s*([A-Za-z]+)\s+(\d{1,2}),\s*(\d{4})",
    )?;
    let Some(caps) = period_re.captures(text) else {
        bail!("statement period not found");
    };

    let date = |month: &str, day: &str, year: &str| -> Option<NaiveDate> {
        let m = month_from_name(month)?;
        NaiveDate::from_ymd_opt(year.parse::<i32>().ok()?, m, day.parse::<u32>().ok()?)
    };
    let start = date(&caps[1], &caps[2], &caps[3]);
    let end = date(&caps[4], &caps[5], &caps[6]);
    let (Some(start), Some(end)) = (start, end) else {
        bail!("invalid statement period '{}'", &caps[0]);
    };

    match StatementPeriod::new(start, end) {
        Some(p) => Ok(p),
        None => bail!("statement period ends before it starts: {start} to {end}"),
    }
}

fn find_balance(text: &str, labels: &str) -> Result<Option<Decimal>> {
    let re = Regex::new(&format!(
        r"(?i)(?:{labels})\s*Balance[:\s]*(-?\s*\$?[\d,]+\.\d{{2}})"
    ))?;
    Ok(re.captures(text).and_then(|c| parse_amount(&c[1])))
}

fn parse_rows(text: &str, period: &StatementPeriod) -> Result<Vec<ParsedRow>> {
    let header_re = Regex::new(r"(?i)TRANSACTION\s+DETAIL")?;
    // A line item is anything in the detail section that opens with a MM/DD token.
    let item_re = Regex::new(r"^\s*\d{1,2}/\d{1,2}\s")?;
    // DATE DESCRIPTION AMOUNT [BALANCE]
    let row_re = Regex::new(concat!(
        r"^\s*(?P<date>\d{1,2}/\d{1,2})\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amount>-?\s?\$?[\d,]+\.\d{2})",
        r"(?:\s+(?P<balance>-?\$?[\d,]+\.\d{2}))?\s*$"
    ))?;
    let trn_re = Regex::new(r"(?i)\bTrn:\s*([A-Za-z0-9]+)")?;

    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|l| header_re.is_match(l))
        .map_or(0, |i| i + 1);

    let mut rows = Vec::new();
    for (idx, line) in lines.iter().enumerate().skip(start) {
        if !item_re.is_match(line) {
            continue;
        }
        let item = LineItem {
            line: idx + 1,
            text: line.trim().to_string(),
        };

        let outcome = match row_re.captures(line) {
            None => Err("row does not match DATE DESCRIPTION AMOUNT [BALANCE]".to_string()),
            Some(caps) => period
                .resolve_mm_dd(&caps["date"])
                .map_err(|e| e.to_string())
                .and_then(|date| {
                    let amount = parse_amount(&caps["amount"])
                        .ok_or_else(|| format!("unparseable amount '{}'", &caps["amount"]))?;
                    let balance = match caps.name("balance") {
                        Some(b) => Some(
                            parse_amount(b.as_str())
                                .ok_or_else(|| format!("unparseable balance '{}'", b.as_str()))?,
                        ),
                        None => None,
                    };
                    let description = caps["desc"].trim().to_string();
                    let external_ref = trn_re.captures(&description).map(|c| c[1].to_string());
                    Ok(RawTransaction {
                        date,
                        description,
                        amount,
                        balance,
                        external_ref,
                    })
                }),
        };
        rows.push(ParsedRow { item, outcome });
    }

    Ok(rows)
}
