//! Parsing of printed money amounts.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a statement amount such as `-1,234.56`, `$53.70` or `- $14.05`.
///
/// The value is taken exactly as printed; nothing is rounded.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let (negative, rest) = match compact.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, compact.strip_prefix('+').unwrap_or(&compact)),
    };
    let rest = rest.strip_prefix('$').unwrap_or(rest);
    if rest.is_empty() || rest.starts_with('-') || rest.starts_with('+') {
        return None;
    }
    if !rest.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return None;
    }

    let value = Decimal::from_str(&rest.replace(',', "")).ok()?;
    Some(if negative { -value } else { value })
}
