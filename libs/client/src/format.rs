//! Display helpers for note cards

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthStyle {
    /// `Jul 4, 2023, 02:30 PM`
    #[default]
    Short,
    /// `July 4, 2023, 02:30 PM`
    Long,
}

/// Human readable form of an RFC 3339 timestamp, in UTC
///
/// Unparseable input yields `Invalid Date`.
pub fn format_timestamp(timestamp: &str, month: MonthStyle) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => format_datetime(&parsed.with_timezone(&Utc), month),
        Err(_) => "Invalid Date".to_string(),
    }
}

pub fn format_datetime(timestamp: &DateTime<Utc>, month: MonthStyle) -> String {
    let pattern = match month {
        MonthStyle::Short => "%b %-d, %Y, %I:%M %p",
        MonthStyle::Long => "%B %-d, %Y, %I:%M %p",
    };
    timestamp.format(pattern).to_string()
}

/// Whether note content is a serialised rich-text document rather than
/// plain text
pub fn is_json_document(content: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(content).is_ok()
}
