//! Tracker timestamp parsing and display formatting.
//!
//! Jira emits several timestamp shapes depending on deployment and field
//! type: RFC 3339, the same with a compact `+0000` offset, and bare
//! `YYYY-MM-DD` dates for date-only custom fields. Parsing tries each known
//! shape in turn and fails open: callers get `None` and fall back to the
//! raw string rather than aborting a report over one bad value.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;

/// Timestamp shapes with a compact offset that RFC 3339 parsing rejects.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.3f%z", // 2025-01-15T10:30:00.000+0300
    "%Y-%m-%dT%H:%M:%S%z",     // 2025-01-15T10:30:00+0300
];

/// Parse a Jira timestamp or date string.
///
/// The returned value keeps the original UTC offset so that date display
/// reflects the tracker's local calendar day. Bare dates are taken as
/// midnight UTC. As a last resort a trailing `±hhmm` offset is repaired to
/// `±hh:mm` and the string is re-tried as RFC 3339.
pub fn parse_jira_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    if raw.is_empty() {
        return None;
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).fixed_offset());
    }

    let offset_repair = Regex::new(r"(\d{2})(\d{2})$").unwrap();
    let repaired = offset_repair.replace(raw, "$1:$2");
    DateTime::parse_from_rfc3339(&repaired).ok()
}

/// Render a date or timestamp as `YYYY-MM-DD`.
///
/// Empty input renders as `N/A`; unparsable input is passed through
/// verbatim so the report still shows what the tracker sent.
pub fn format_date(raw: &str) -> String {
    if raw.is_empty() {
        return "N/A".to_string();
    }
    match parse_jira_date(raw) {
        Some(parsed) => parsed.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

/// Render a timestamp as a Markdown date link, `[YYYY-MM-DD](url)`.
///
/// With `include_days_ago` the date gains a relative age suffix such as
/// `(today)` or `(3 days ago)`. Missing timestamps or URLs render as
/// `N/A`; unparsable timestamps are passed through verbatim.
pub fn format_timestamp_link(timestamp: &str, url: &str, include_days_ago: bool) -> String {
    if timestamp.is_empty() || timestamp == "N/A" || url.is_empty() {
        return "N/A".to_string();
    }

    let Some(parsed) = parse_jira_date(timestamp) else {
        return timestamp.to_string();
    };

    let date = parsed.format("%Y-%m-%d");
    if include_days_ago {
        let days = Utc::now().signed_duration_since(parsed).num_days();
        let age = match days {
            0 => " (today)".to_string(),
            1 => " (1 day ago)".to_string(),
            n => format!(" ({n} days ago)"),
        };
        format!("[{date}{age}]({url})")
    } else {
        format!("[{date}]({url})")
    }
}
