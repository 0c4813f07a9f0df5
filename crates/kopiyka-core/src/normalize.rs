//! Locale-aware amount and date normalization
//!
//! Statement exports mix Ukrainian and ISO conventions: `1 500,00`,
//! `-1500.50`, `1,234,567`, `31.01.2026 08:48`, Unix timestamps from
//! API-backed exports. Every parser here returns `None` instead of failing;
//! callers decide whether a miss drops the row (amounts) or falls back to the
//! ingestion time (dates).

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date layouts tried in order by [`parse_date`]
const DATE_FORMATS: &[DateLayout] = &[
    DateLayout::DateTime("%d.%m.%Y %H:%M:%S"),
    DateLayout::DateTime("%d.%m.%Y %H:%M"),
    DateLayout::Date("%d.%m.%Y"),
    DateLayout::DateTime("%Y-%m-%d %H:%M:%S"),
    DateLayout::Date("%Y-%m-%d"),
    DateLayout::Date("%d/%m/%Y"),
    DateLayout::Date("%Y/%m/%d"),
    DateLayout::Date("%d-%m-%Y"),
];

/// Layouts used in PDF statement date cells
const STATEMENT_DATE_FORMATS: &[DateLayout] = &[
    DateLayout::DateTime("%d.%m.%Y %H:%M"),
    DateLayout::DateTime("%d.%m.%Y %H:%M:%S"),
    DateLayout::Date("%d.%m.%Y"),
];

#[derive(Debug, Clone, Copy)]
enum DateLayout {
    DateTime(&'static str),
    Date(&'static str),
}

impl DateLayout {
    fn parse(&self, s: &str) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(fmt) => NaiveDateTime::parse_from_str(s, fmt).ok(),
            Self::Date(fmt) => NaiveDate::parse_from_str(s, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
    }
}

/// Parse a locale-specific amount string
///
/// Spaces (plain and non-breaking) are thousands separators. A single comma
/// with no dot is a decimal separator; any other comma is a thousands
/// separator.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '\u{a0}' && *c != ' ')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();
    let cleaned = if commas == 1 && dots == 0 {
        cleaned.replace(',', ".")
    } else if commas >= 1 {
        cleaned.replace(',', "")
    } else {
        cleaned
    };

    finite(cleaned.parse::<f64>().ok()?)
}

/// Parse an amount whose digit groups are separated by single spaces
///
/// PDF cells render `-1 000.00`; only spaces sitting between two digits are
/// removed, so `1 2` becomes `12` but `- 5` stays unparseable.
pub fn parse_spaced_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let mut cleaned = String::with_capacity(trimmed.len());
    for (i, c) in chars.iter().enumerate() {
        let is_separator = (*c == ' ' || *c == '\u{a0}')
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if !is_separator {
            cleaned.push(*c);
        }
    }

    finite(cleaned.parse::<f64>().ok()?)
}

/// Parse a date or date-time string
///
/// A pure-digit string of 9+ characters is a Unix timestamp (seconds, UTC).
/// Otherwise the day-first and ISO layouts are tried in a fixed order and the
/// first match wins.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.len() >= 9 && s.chars().all(|c| c.is_ascii_digit()) {
        if let Some(ts) = s
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        {
            return Some(ts.naive_utc());
        }
    }

    DATE_FORMATS.iter().find_map(|layout| layout.parse(s))
}

/// Parse a PDF statement date cell, which may carry the time on a second line
pub fn parse_statement_date(raw: &str) -> Option<NaiveDateTime> {
    let normalized = raw.replace('\n', " ");
    let s = normalized.trim();
    if s.is_empty() {
        return None;
    }
    STATEMENT_DATE_FORMATS.iter().find_map(|layout| layout.parse(s))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_amount_locale_variants() {
        assert_eq!(parse_amount("1 500,00"), Some(1500.00));
        assert_eq!(parse_amount("-1500.50"), Some(-1500.50));
        assert_eq!(parse_amount("1,234,567"), Some(1234567.0));
        assert_eq!(parse_amount("1\u{a0}250.75"), Some(1250.75));
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("+5000"), Some(5000.0));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("12.34.56"), None);
    }

    #[test]
    fn test_parse_spaced_amount() {
        assert_eq!(parse_spaced_amount("-1 000.00"), Some(-1000.0));
        assert_eq!(parse_spaced_amount("1 812.00"), Some(1812.0));
        assert_eq!(parse_spaced_amount(" 12 345 678.90 "), Some(12345678.90));
        assert_eq!(parse_spaced_amount(""), None);
        assert_eq!(parse_spaced_amount("- 5.00"), None);
    }

    #[test]
    fn test_parse_date_day_first() {
        assert_eq!(parse_date("01.01.2025 10:00"), Some(dt(2025, 1, 1, 10, 0)));
        assert_eq!(
            parse_date("31.01.2026 08:48:15"),
            NaiveDate::from_ymd_opt(2026, 1, 31)
                .unwrap()
                .and_hms_opt(8, 48, 15)
        );
        assert_eq!(parse_date("15.03.2024"), Some(dt(2024, 3, 15, 0, 0)));
        assert_eq!(parse_date("15/03/2024"), Some(dt(2024, 3, 15, 0, 0)));
        assert_eq!(parse_date("15-03-2024"), Some(dt(2024, 3, 15, 0, 0)));
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(parse_date("2024-03-15"), Some(dt(2024, 3, 15, 0, 0)));
        assert_eq!(
            parse_date("2024-03-15 12:30:00"),
            Some(dt(2024, 3, 15, 12, 30))
        );
        assert_eq!(parse_date("2024/03/15"), Some(dt(2024, 3, 15, 0, 0)));
    }

    #[test]
    fn test_parse_date_unix_timestamp() {
        assert_eq!(parse_date("1735725600"), Some(dt(2025, 1, 1, 10, 0)));
        // Short digit strings are not timestamps
        assert_eq!(parse_date("12345678"), None);
    }

    #[test]
    fn test_parse_date_failure() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_statement_date_two_lines() {
        assert_eq!(
            parse_statement_date("31.01.2026\n08:48"),
            Some(dt(2026, 1, 31, 8, 48))
        );
        assert_eq!(
            parse_statement_date("31.01.2026"),
            Some(dt(2026, 1, 31, 0, 0))
        );
        assert_eq!(parse_statement_date("Дата"), None);
    }
}
