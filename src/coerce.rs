//! Cell parsing shared by validation and payload building, so a value that
//! validates is converted the same way it was checked.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

pub fn is_valid_email(raw: &str) -> bool {
    EMAIL_PATTERN.is_match(raw)
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Parse a monetary amount written with either decimal convention.
///
/// Everything but digits, `,`, `.` and `-` is dropped. When both separators
/// appear the later one is the decimal mark; a single `,` is a decimal mark;
/// repeated separators of one kind are thousands marks.
pub fn parse_money(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();
    let canonical = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if commas > 1 => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        (None, Some(_)) if dots > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    canonical.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts ISO and day-first dates, ignoring a trailing time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw
        .trim()
        .split(|c: char| c == 'T' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Case-insensitive lookup in a closed set of values.
pub fn match_choice(raw: &str, domain: &'static [&'static str]) -> Option<&'static str> {
    let wanted = raw.trim().to_lowercase();
    domain.iter().copied().find(|v| *v == wanted)
}
