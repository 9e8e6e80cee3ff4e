//! Free-text parsers for the prose fields of the encyclopedia dump.
//!
//! Every parser returns `None` for text it does not recognise; a miss is noise
//! to be dropped, never an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::RawValue;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}

/// `$A - $B`, `$A–B million`: captures the first bound and both optional units
static CURRENCY_RANGE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\$\s*(\d[\d,.]*)\s*([mb]illi?on)?\s*[-—–]\s*\$?\s*\d[\d,.]*\s*([mb]illi?on)?")
});

/// Citation markers such as `[12]`
static CITATION: Lazy<Regex> = Lazy::new(|| compile(r"\[\d+\]\s*"));

/// `$12.5 million`, `$1 billion`; anchored at a dollar sign
static SCALED_AMOUNT: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\$\s*(\d+\.?\d*)\s*([mb])illi?on"));

/// `$1,234,567`, `$1.234.567`; anchored at a dollar sign
static GROUPED_AMOUNT: Lazy<Regex> = Lazy::new(|| compile(r"^\$\s*\d{1,3}(?:[,.]\d{3})+"));

static UNIT_SUFFIX: Lazy<Regex> = Lazy::new(|| compile(r"(?i)^\s[mb]illion"));

static DURATION: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)(\d+)\s*ho?u?r?s?\s*(\d*)|(\d+)\s*m"));

static RELEASE_DATE: Lazy<Regex> = Lazy::new(|| {
    let months = MONTHS.join("|");
    compile(&format!(
        concat!(
            r"(?P<mdy_m>{m})\s(?P<mdy_d>[0123]?\d),\s(?P<mdy_y>\d{{4}})",
            r"|(?P<ymd_y>\d{{4}}).(?P<ymd_m>[01]\d).(?P<ymd_d>[0123]\d)",
            r"|(?P<my_m>{m})\s(?P<my_y>\d{{4}})",
            r"|(?P<y>\d{{4}})"
        ),
        m = months
    ))
});

/// Rewrite every `$A – B` range to its first bound, keeping the unit word
/// from whichever side carries one.
fn collapse_ranges(text: &str) -> String {
    CURRENCY_RANGE
        .replace_all(text, |caps: &Captures| {
            let unit = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| format!(" {}", m.as_str()))
                .unwrap_or_default();
            format!("${}{}", &caps[1], unit)
        })
        .into_owned()
}

fn parse_scaled(candidate: &str) -> Option<f64> {
    let caps = SCALED_AMOUNT.captures(candidate)?;
    let number: f64 = caps[1].parse().ok()?;
    let multiplier = if caps[2].eq_ignore_ascii_case("b") {
        1e9
    } else {
        1e6
    };
    Some((number * multiplier).round())
}

/// Digit-grouped literal, rejected when directly followed by a unit word.
/// When the full grouping is followed by one, shorter groupings are tried so
/// `$1,500,000 million` still yields `1500`.
fn parse_grouped(candidate: &str) -> Option<f64> {
    let matched = GROUPED_AMOUNT.find(candidate)?.as_str();
    let groups = matched.chars().filter(|c| *c == ',' || *c == '.').count();

    (0..groups).find_map(|dropped| {
        let end = matched.len() - dropped * 4;
        if UNIT_SUFFIX.is_match(&candidate[end..]) {
            return None;
        }
        let digits: String = candidate[..end]
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        // Digit-only strings always parse as f64, so a miss here never
        // falls through to a shorter grouping
        digits.parse::<f64>().ok()
    })
}

/// Parse a dollar amount from prose, in whole dollars.
///
/// Recognises `$N million`, `$N billion` and digit-grouped `$N,NNN,NNN`;
/// the leftmost dollar sign that starts one of these shapes wins. Ranges
/// report their first bound and citation markers are ignored.
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned = collapse_ranges(&CITATION.replace_all(text, ""));

    cleaned.match_indices('$').find_map(|(idx, _)| {
        let candidate = &cleaned[idx..];
        parse_scaled(candidate).or_else(|| parse_grouped(candidate))
    })
}

/// Parse a running time in minutes: `2 hours 15 min`, `2h 15m`, `90 min`.
pub fn parse_duration(text: &str) -> Option<u32> {
    let caps = DURATION.captures(text)?;
    if let Some(minutes) = caps.get(3) {
        return minutes.as_str().parse().ok();
    }

    let hours: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u32 = match caps.get(2).map(|m| m.as_str()) {
        Some(m) if !m.is_empty() => m.parse().ok()?,
        _ => 0,
    };
    hours.checked_mul(60)?.checked_add(minutes)
}

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

fn capture<T: std::str::FromStr>(caps: &Captures, name: &str) -> Option<T> {
    caps.name(name)?.as_str().parse().ok()
}

/// Parse the first date-like fragment of the text.
///
/// Shapes, by priority at the same position: `January 5, 1999`,
/// `1999-01-05` (any single separator), `January 1999`, `1999`. Missing
/// day or month resolves to the first of the period.
pub fn parse_release_date(text: &str) -> Option<NaiveDate> {
    let caps = RELEASE_DATE.captures(text)?;

    let (year, month, day) = if caps.name("mdy_m").is_some() {
        (
            capture(&caps, "mdy_y")?,
            month_number(caps.name("mdy_m")?.as_str())?,
            capture(&caps, "mdy_d")?,
        )
    } else if caps.name("ymd_y").is_some() {
        (
            capture(&caps, "ymd_y")?,
            capture(&caps, "ymd_m")?,
            capture(&caps, "ymd_d")?,
        )
    } else if caps.name("my_m").is_some() {
        (
            capture(&caps, "my_y")?,
            month_number(caps.name("my_m")?.as_str())?,
            1,
        )
    } else {
        (capture(&caps, "y")?, 1, 1)
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

/// `parse_currency` over a raw field; lists are joined, non-text is absent
pub fn currency_from_raw(value: &RawValue) -> Option<f64> {
    value.as_text().and_then(|text| parse_currency(&text))
}

pub fn duration_from_raw(value: &RawValue) -> Option<u32> {
    value.as_text().and_then(|text| parse_duration(&text))
}

pub fn release_date_from_raw(value: &RawValue) -> Option<NaiveDate> {
    value.as_text().and_then(|text| parse_release_date(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grouped(amount: f64) -> String {
        let digits = format!("{}", amount as u64);
        let mut out = String::new();
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        format!("${}", out)
    }

    #[test]
    fn test_parse_currency_scaled_amounts() {
        assert_eq!(parse_currency("$1.2 million"), Some(1_200_000.0));
        assert_eq!(parse_currency("$3 billion"), Some(3_000_000_000.0));
        assert_eq!(parse_currency("$ 45 Million"), Some(45_000_000.0));
        assert_eq!(parse_currency("$7.5 millon"), Some(7_500_000.0));
    }

    #[test]
    fn test_parse_currency_grouped_amounts() {
        assert_eq!(parse_currency("$1,234,567"), Some(1_234_567.0));
        assert_eq!(parse_currency("$1.234.567"), Some(1_234_567.0));
        assert_eq!(parse_currency("US$ 12,000 (estimated)"), Some(12_000.0));
        assert_eq!(parse_currency("$1,500 million"), None);
    }

    #[test]
    fn test_parse_currency_ranges_keep_first_bound() {
        assert_eq!(parse_currency("$5 million - $6 million"), Some(5_000_000.0));
        assert_eq!(parse_currency("$20–25 million"), Some(20_000_000.0));
        assert_eq!(parse_currency("$1,000,000—$2,000,000"), Some(1_000_000.0));
    }

    #[test]
    fn test_parse_currency_ignores_citations() {
        assert_eq!(parse_currency("$14 million[1]"), Some(14_000_000.0));
        assert_eq!(parse_currency("[3] $2,500,000"), Some(2_500_000.0));
    }

    #[test]
    fn test_parse_currency_without_dollar_is_absent() {
        for text in ["14 million", "unknown", "", "£3,000,000", "1,234,567"] {
            assert_eq!(parse_currency(text), None, "{text:?}");
        }
        assert_eq!(parse_currency("$ unknown"), None);
    }

    #[test]
    fn test_parse_currency_keeps_amounts_beyond_u64() {
        assert_eq!(
            parse_currency("$123,456,789,012,345,678,901,234"),
            Some(123_456_789_012_345_678_901_234.0)
        );
    }

    #[test]
    fn test_parse_currency_is_idempotent_on_output() {
        for text in ["$1.2 million", "$3 billion", "$1,234,567", "$45.5 million"] {
            let value = parse_currency(text).unwrap();
            assert_eq!(parse_currency(&grouped(value)), Some(value), "{text:?}");
        }
    }

    #[test]
    fn test_currency_from_raw_handles_lists_and_non_text() {
        let list = RawValue::List(vec!["$10 million".into(), "(gross)".into()]);
        assert_eq!(currency_from_raw(&list), Some(10_000_000.0));
        assert_eq!(currency_from_raw(&RawValue::Number(1e6)), None);
        assert_eq!(currency_from_raw(&RawValue::Null), None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2h 15m"), Some(135));
        assert_eq!(parse_duration("2 hours 15 min"), Some(135));
        assert_eq!(parse_duration("90 min"), Some(90));
        assert_eq!(parse_duration("102 minutes"), Some(102));
        assert_eq!(parse_duration("1 Hour"), Some(60));
        assert_eq!(parse_duration("no runtime listed"), None);
    }

    #[test]
    fn test_duration_from_raw_joins_lists() {
        let list = RawValue::List(vec!["97 minutes".into(), "(director's cut)".into()]);
        assert_eq!(duration_from_raw(&list), Some(97));
    }

    #[test]
    fn test_parse_release_date_shapes() {
        assert_eq!(parse_release_date("January 5, 1999"), Some(date(1999, 1, 5)));
        assert_eq!(parse_release_date("December 25, 2003 (US)"), Some(date(2003, 12, 25)));
        assert_eq!(parse_release_date("1999-01-05"), Some(date(1999, 1, 5)));
        assert_eq!(parse_release_date("1999/01/05"), Some(date(1999, 1, 5)));
        assert_eq!(parse_release_date("March 1987"), Some(date(1987, 3, 1)));
        assert_eq!(parse_release_date("1999"), Some(date(1999, 1, 1)));
    }

    #[test]
    fn test_textual_and_numeric_dates_agree() {
        assert_eq!(
            parse_release_date("July 16, 1990"),
            parse_release_date("1990-07-16")
        );
    }

    #[test]
    fn test_parse_release_date_rejects_impossible_and_missing() {
        assert_eq!(parse_release_date("February 30, 2001"), None);
        assert_eq!(parse_release_date("TBA"), None);
    }

    #[test]
    fn test_release_date_from_raw_uses_first_of_multiple() {
        let list = RawValue::List(vec!["May 3, 2002 (Cannes)".into(), "June 7, 2002".into()]);
        assert_eq!(release_date_from_raw(&list), Some(date(2002, 5, 3)));
    }
}
