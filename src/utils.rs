use crate::workbook::CellValue;
use chrono::Month;
use std::str::FromStr;

const MAX_MONTH_LABEL_LEN: usize = 16;

/// Coerces a cell to a number.
///
/// Numbers pass through; text is parsed as a possibly currency-formatted
/// amount. Everything else is a missing value.
pub fn coerce_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) | CellValue::Empty => None,
        CellValue::Text(s) => parse_amount(s),
    }
}

/// Parses amounts such as `$1,234.50`, `-€200`, `(45.10)` or `12.5%`.
///
/// Accounting-style parentheses mean negative. A trailing percent sign is
/// dropped without rescaling. Returns `None` for anything that is not a plain
/// number once symbols are removed.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = &s[1..s.len() - 1];
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',' | ' ' | '\u{a0}'))
        .collect();
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);

    if cleaned.is_empty() || cleaned.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let value = cleaned.parse::<f64>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// True when a header cell looks like a month label: a short token naming a
/// month (`Mar`, `March 2025`, `Sept-24`) or ending in a two-digit year
/// suffix (`03.25`, `Q1'25`).
pub fn is_month_label(cell: &CellValue) -> bool {
    match cell {
        CellValue::Text(s) => is_month_text(s),
        _ => false,
    }
}

fn is_month_text(raw: &str) -> bool {
    let s = raw.trim();
    if s.is_empty() || s.chars().count() > MAX_MONTH_LABEL_LEN {
        return false;
    }

    let names_month = s
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .any(is_month_word);

    names_month || has_two_digit_year_suffix(s)
}

fn is_month_word(token: &str) -> bool {
    token.eq_ignore_ascii_case("sept") || Month::from_str(token).is_ok()
}

fn has_two_digit_year_suffix(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 4 {
        return false;
    }

    let n = chars.len();
    let (sep, d1, d2) = (chars[n - 3], chars[n - 2], chars[n - 1]);
    if !matches!(sep, '\'' | '-' | '/' | '.' | ' ') || !d1.is_ascii_digit() || !d2.is_ascii_digit()
    {
        return false;
    }

    let prefix: String = chars[..n - 3].iter().collect();
    let prefix = prefix.trim();
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_alphanumeric()) {
        return false;
    }

    // A long numeric prefix is an amount ("1234.25"), not a month.
    let all_digits = prefix.chars().all(|c| c.is_ascii_digit());
    !all_digits || prefix.len() <= 2
}

/// Trims and collapses inner whitespace so labels compare reliably.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn labels_match(a: &str, b: &str) -> bool {
    normalize_label(a).to_uppercase() == normalize_label(b).to_uppercase()
}

pub fn present_values(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Sum with missing values counted as zero.
pub fn sum_present(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn max_value(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

pub fn min_value(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

pub fn first_present(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().next().copied()
}

pub fn last_present(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().flatten().next().copied()
}

/// `numerator / denominator * 100`, or 0 when the denominator is 0.
pub fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}
