#![forbid(unsafe_code)]

//! Timestamp, date, currency and checkbox value formatting for the composer.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use seal_kernel_contracts::submission::AccountTimezone;
use seal_kernel_contracts::UnixTimeMs;

const TIMESTAMP_FORMAT: &str = "%B %d, %Y %H:%M";

/// `"January 05, 2024 14:30 UTC"`, shifted into the account's offset.
pub fn format_timestamp(at: UnixTimeMs, tz: &AccountTimezone) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(at.0) else {
        return at.0.to_string();
    };
    let local = match FixedOffset::east_opt(tz.utc_offset_minutes.saturating_mul(60)) {
        Some(offset) => utc.with_timezone(&offset).naive_local(),
        None => utc.naive_utc(),
    };
    format!("{} {}", local.format(TIMESTAMP_FORMAT), tz.abbreviation)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateToken {
    Year4,
    Year2,
    MonthName,
    MonthAbbr,
    Month2,
    Month,
    Day2,
    Day,
}

// Longest tokens first so "MMMM" is not read as "MM" twice.
const DATE_TOKENS: &[(&str, DateToken)] = &[
    ("YYYY", DateToken::Year4),
    ("MMMM", DateToken::MonthName),
    ("MMM", DateToken::MonthAbbr),
    ("YY", DateToken::Year2),
    ("MM", DateToken::Month2),
    ("DD", DateToken::Day2),
    ("M", DateToken::Month),
    ("D", DateToken::Day),
];

/// Reformats a stored `YYYY-MM-DD` value. Anything unparseable passes through.
pub fn format_date_value(raw: &str, format: &str) -> String {
    let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;
    'outer: while !rest.is_empty() {
        for (pattern, token) in DATE_TOKENS {
            if let Some(tail) = rest.strip_prefix(pattern) {
                push_date_token(&mut out, date, *token);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn push_date_token(out: &mut String, date: NaiveDate, token: DateToken) {
    let piece = match token {
        DateToken::Year4 => format!("{:04}", date.year()),
        DateToken::Year2 => format!("{:02}", date.year().rem_euclid(100)),
        DateToken::MonthName => date.format("%B").to_string(),
        DateToken::MonthAbbr => date.format("%b").to_string(),
        DateToken::Month2 => format!("{:02}", date.month()),
        DateToken::Month => date.month().to_string(),
        DateToken::Day2 => format!("{:02}", date.day()),
        DateToken::Day => date.day().to_string(),
    };
    out.push_str(&piece);
}

/// Two decimal places, `,` thousands delimiter, symbol prefix when known.
pub fn format_currency(amount: Decimal, symbol: Option<&str>) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!(
        "{}{}{}.{}",
        if negative { "-" } else { "" },
        symbol.unwrap_or(""),
        grouped,
        frac_part
    )
}

/// `yes_please` -> `Yes Please`.
pub fn titleize(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn tz(minutes: i32, abbr: &str) -> AccountTimezone {
        AccountTimezone {
            utc_offset_minutes: minutes,
            abbreviation: abbr.to_string(),
        }
    }

    #[test]
    fn at_format_01_timestamp_applies_offset_and_abbreviation() {
        // 2024-01-05T14:30:00Z
        let at = UnixTimeMs(1_704_465_000_000);
        assert_eq!(format_timestamp(at, &AccountTimezone::utc()), "January 05, 2024 14:30 UTC");
        assert_eq!(format_timestamp(at, &tz(-300, "EST")), "January 05, 2024 09:30 EST");
        assert_eq!(format_timestamp(at, &tz(600, "AEST")), "January 06, 2024 00:30 AEST");
    }

    #[test]
    fn at_format_02_date_tokens_are_rewritten() {
        assert_eq!(format_date_value("2024-03-07", "MM/DD/YYYY"), "03/07/2024");
        assert_eq!(format_date_value("2024-03-07", "D MMMM YYYY"), "7 March 2024");
        assert_eq!(format_date_value("2024-03-07", "DD.MM.YY"), "07.03.24");
        assert_eq!(format_date_value("2024-03-07", "MMM D, YYYY"), "Mar 7, 2024");
    }

    #[test]
    fn at_format_03_unparseable_date_passes_through() {
        assert_eq!(format_date_value("next tuesday", "MM/DD/YYYY"), "next tuesday");
    }

    #[test]
    fn at_format_04_currency_rounds_and_groups() {
        let d = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(format_currency(d("25"), Some("€")), "€25.00");
        assert_eq!(format_currency(d("1234567.005"), Some("$")), "$1,234,567.01");
        assert_eq!(format_currency(d("999.9"), None), "999.90");
        assert_eq!(format_currency(d("0"), Some("£")), "£0.00");
    }

    #[test]
    fn at_format_05_titleize_words() {
        assert_eq!(titleize("true"), "True");
        assert_eq!(titleize("yes_please"), "Yes Please");
        assert_eq!(titleize("I AGREE"), "I Agree");
    }
}
