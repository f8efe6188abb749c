//! Shared utilities for CLI commands.

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use pt_core::{ValidationError, is_supported};
use regex::Regex;

/// Pre-compiled regex for relative day parsing.
static RELATIVE_DAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+days?\s+ago$").unwrap());

/// Parse a calendar day as either `YYYY-MM-DD` or a relative day.
///
/// Supports:
/// - ISO 8601 date: "2025-01-15"
/// - Relative: "today", "yesterday", "3 days ago"
///
/// Relative days are resolved against `today`, which callers take from the
/// UTC clock. Dates outside years 0000-9999 are rejected.
pub fn parse_day(s: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let trimmed = s.trim();
    let invalid = || ValidationError::InvalidDate {
        value: s.to_string(),
    };

    let date = match trimmed {
        "today" => Some(today),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        _ => match RELATIVE_DAY_RE.captures(trimmed) {
            Some(caps) => {
                let days: u64 = caps[1].parse().map_err(|_| invalid())?;
                today.checked_sub_days(Days::new(days))
            }
            None => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok(),
        },
    };

    date.filter(|date| is_supported(*date)).ok_or_else(invalid)
}

/// Formats a duration as "Xh Ym" if >= 1 hour, "Xm" otherwise.
pub fn format_duration(duration: Duration) -> String {
    let total_minutes = duration.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
