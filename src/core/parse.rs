//! Amount and date parsing for broker exports.
//!
//! Exports mix `1234.56`, `1234,56` and `1 234,56`; every value goes through
//! [`parse_amount`] so nothing is ever silently read as zero.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("value is empty")]
    Empty,
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("'{value}' is not a date in format '{format}'")]
    InvalidDate { value: String, format: String },
}

/// Parse a decimal amount.
///
/// Canonical decimal notation is tried first. Otherwise grouping spaces are
/// stripped and the separators normalized: when both `,` and `.` occur the last
/// one is the decimal separator, a lone `,` is always the decimal separator.
pub fn parse_amount(raw: &str) -> Result<Decimal, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    if let Ok(value) = Decimal::from_str(trimmed) {
        return Ok(value);
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();

    let normalized = match (compact.rfind(','), compact.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(_), None) => compact.replace(',', "."),
        _ => compact,
    };

    Decimal::from_str(&normalized).map_err(|_| ParseError::NotANumber(trimmed.to_string()))
}

/// Parse a date with a chrono format, ignoring a trailing time of day
pub fn parse_date(raw: &str, format: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    NaiveDate::parse_from_str(trimmed, format)
        .or_else(|_| {
            let head = trimmed.split_whitespace().next().unwrap_or(trimmed);
            NaiveDate::parse_from_str(head, format)
        })
        .map_err(|_| ParseError::InvalidDate {
            value: trimmed.to_string(),
            format: format.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn canonical_decimal() {
        assert_eq!(parse_amount("1234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("-0.5").unwrap(), dec!(-0.5));
        assert_eq!(parse_amount(" 42 ").unwrap(), dec!(42));
    }

    #[test]
    fn comma_decimal_separator() {
        assert_eq!(parse_amount("12,5").unwrap(), dec!(12.5));
        assert_eq!(parse_amount("-300,50").unwrap(), dec!(-300.50));
    }

    #[test]
    fn thousands_spaces() {
        assert_eq!(parse_amount("1 234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("1\u{a0}000\u{a0}000").unwrap(), dec!(1000000));
        assert_eq!(parse_amount("\u{2212}2\u{202f}500,00").unwrap(), dec!(-2500));
    }

    #[test]
    fn mixed_separators() {
        assert_eq!(parse_amount("1.234,56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("1,234.56").unwrap(), dec!(1234.56));
    }

    #[test]
    fn garbage_is_an_error() {
        assert_eq!(
            parse_amount("abc"),
            Err(ParseError::NotANumber("abc".to_string()))
        );
        assert!(parse_amount("1,234,567").is_err());
        assert_eq!(parse_amount("   "), Err(ParseError::Empty));
    }

    #[test]
    fn day_month_year_dates() {
        assert_eq!(
            parse_date("31.12.2021", "%d.%m.%Y").unwrap(),
            NaiveDate::from_ymd_opt(2021, 12, 31).unwrap()
        );
    }

    #[test]
    fn trailing_time_ignored() {
        assert_eq!(
            parse_date("2022-01-01 09:30:00", "%Y-%m-%d").unwrap(),
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()
        );
    }

    #[test]
    fn wrong_format_is_an_error() {
        let err = parse_date("2022-01-01", "%d.%m.%Y").unwrap_err();
        assert!(matches!(err, ParseError::InvalidDate { .. }));
    }
}
