//! Display formatting for numbers, prices, percentages and timestamps.
//!
//! Every formatter takes `impl Into<Option<f64>>` so callers can pass either
//! a plain `f64` or an optional value straight from a payload. Missing, NaN
//! and infinite inputs render as `"N/A"`; zero never does.

use chrono::{DateTime, Utc};
use coinboard_common::constants::NOT_AVAILABLE;

const COMPACT_UNITS: [(f64, &str); 5] = [
    (1.0, ""),
    (1e3, "K"),
    (1e6, "M"),
    (1e9, "B"),
    (1e12, "T"),
];

fn finite(value: impl Into<Option<f64>>) -> Option<f64> {
    value.into().filter(|v| v.is_finite())
}

/// Format a number for display.
///
/// - `0 < v < 0.01` keeps 6 decimals so dust prices stay readable.
/// - `compact` uses K/M/B/T with at most 2 fraction digits, trailing zeros
///   trimmed (`1.5M`, `12K`).
/// - Otherwise en-US grouping with exactly 2 decimals (`1,234.50`).
pub fn format_number(value: impl Into<Option<f64>>, compact: bool) -> String {
    let Some(v) = finite(value) else {
        return NOT_AVAILABLE.to_string();
    };
    if v > 0.0 && v < 0.01 {
        return format!("{v:.6}");
    }
    if compact {
        return format_compact(v);
    }
    group_thousands(&format!("{v:.2}"))
}

/// `"$"` + [`format_number`]. The `"N/A"` sentinel is returned unprefixed.
pub fn format_currency(value: impl Into<Option<f64>>, compact: bool) -> String {
    match finite(value) {
        Some(v) => format!("${}", format_number(v, compact)),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Signed percentage with 2 decimals: `+1.25%`, `-0.40%`.
pub fn format_percentage(value: impl Into<Option<f64>>) -> String {
    match finite(value) {
        Some(v) if v >= 0.0 => format!("+{v:.2}%"),
        Some(v) => format!("{v:.2}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn format_compact(v: f64) -> String {
    let abs = v.abs();
    let mut idx = COMPACT_UNITS
        .iter()
        .rposition(|(threshold, _)| abs >= *threshold)
        .unwrap_or(0);
    loop {
        let (threshold, suffix) = COMPACT_UNITS[idx];
        let mut scaled = (v / threshold * 100.0).round() / 100.0;
        // rounding can carry into the next unit (999_999 → 1000K → 1M)
        if scaled.abs() >= 1000.0 && idx + 1 < COMPACT_UNITS.len() {
            idx += 1;
            continue;
        }
        if scaled == 0.0 {
            scaled = 0.0;
        }
        return format!("{}{suffix}", trim_fraction(&format!("{scaled:.2}")));
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Insert `,` every three integer digits of an already-formatted number.
fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Format a millisecond timestamp as a UTC string (`2024-03-01 14:05:09`).
pub fn format_timestamp_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Format an RFC 3339 date (as CoinGecko sends `ath_date`) as `YYYY-MM-DD`.
pub fn format_date(rfc3339: &str) -> String {
    match DateTime::parse_from_rfc3339(rfc3339) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
        Err(_) if rfc3339.trim().is_empty() => NOT_AVAILABLE.to_string(),
        Err(_) => rfc3339.to_string(),
    }
}
