// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{DateTime, NaiveDate, Utc};

/// Parse a stored document date.
///
/// Accepts full RFC3339 timestamps and bare calendar days (`YYYY-MM-DD`),
/// the latter mapped to midnight UTC so the calendar day survives a round trip.
pub fn parse_document_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Short human-readable date for chart axes ("Jan 5, 2023").
pub fn format_display_date(date: DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}
