//! Status classification.
//!
//! Jira statuses are free-form text configured per site. The classifier
//! maps the names this tool recognizes onto a closed set of buckets that
//! drive display emoji, trending labels, and report ordering. Unrecognized
//! names are data, not errors: they sort last and render with `❓`.

use chrono::{NaiveDate, Utc};

use crate::dates;

pub const EMOJI_DONE: &str = "🟣";
pub const EMOJI_IN_PROGRESS: &str = "🟢";
pub const EMOJI_AT_RISK: &str = "🟡";
pub const EMOJI_OFF_TRACK: &str = "🔴";
pub const EMOJI_NOT_STARTED: &str = "⚪";
pub const EMOJI_UNKNOWN: &str = "❓";

/// Sort priority assigned to statuses outside the known buckets.
pub const UNKNOWN_PRIORITY: usize = 999;

/// The status buckets the report understands, declared in sort-priority
/// order: active work first, the finished family next, the not-started
/// family last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBucket {
    InProgress,
    AtRisk,
    OffTrack,
    Blocked,
    Done,
    Closed,
    Resolved,
    NotStarted,
    ReadyForWork,
    Vetting,
    New,
}

impl StatusBucket {
    /// Classify a raw status name. Matching trims whitespace and ignores
    /// case; anything else returns `None`.
    pub fn from_name(name: &str) -> Option<StatusBucket> {
        match normalize_status(name).as_str() {
            "in progress" => Some(Self::InProgress),
            "at risk" => Some(Self::AtRisk),
            "off track" => Some(Self::OffTrack),
            "blocked" => Some(Self::Blocked),
            "done" => Some(Self::Done),
            "closed" => Some(Self::Closed),
            "resolved" => Some(Self::Resolved),
            "not started" => Some(Self::NotStarted),
            "ready for work" => Some(Self::ReadyForWork),
            "vetting" => Some(Self::Vetting),
            "new" => Some(Self::New),
            _ => None,
        }
    }

    /// Whether this bucket means the work is finished.
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done | Self::Closed | Self::Resolved)
    }

    /// Whether this bucket means the work has not begun.
    pub fn is_not_started(self) -> bool {
        matches!(
            self,
            Self::NotStarted | Self::ReadyForWork | Self::Vetting | Self::New
        )
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Done | Self::Closed | Self::Resolved => EMOJI_DONE,
            Self::InProgress => EMOJI_IN_PROGRESS,
            Self::AtRisk => EMOJI_AT_RISK,
            Self::OffTrack | Self::Blocked => EMOJI_OFF_TRACK,
            Self::NotStarted | Self::ReadyForWork | Self::Vetting | Self::New => {
                EMOJI_NOT_STARTED
            }
        }
    }
}

/// Canonical form used for classification and stored on records.
pub fn normalize_status(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Sort priority of a status name. Lower sorts first; unrecognized names
/// get [`UNKNOWN_PRIORITY`] and sort after every known bucket.
pub fn status_priority(name: &str) -> usize {
    match StatusBucket::from_name(name) {
        Some(bucket) => bucket as usize,
        None => UNKNOWN_PRIORITY,
    }
}

/// Display emoji for a status name, before the overdue override.
pub fn status_emoji(name: &str) -> &'static str {
    StatusBucket::from_name(name).map_or(EMOJI_UNKNOWN, StatusBucket::emoji)
}

/// Whether an issue is past its target date and still open.
///
/// Finished work is never overdue, whatever its target date says. An
/// empty or `"None"` target never trips the check, and so does one that
/// fails to parse. Date-only targets are overdue strictly after the
/// target day (not on it); full timestamps strictly after the instant.
pub fn is_overdue(status_name: &str, target_end: &str) -> bool {
    if StatusBucket::from_name(status_name).is_some_and(StatusBucket::is_done) {
        return false;
    }
    if target_end.is_empty() || target_end == "None" {
        return false;
    }

    if !target_end.contains('T') {
        let Ok(due) = NaiveDate::parse_from_str(target_end, "%Y-%m-%d") else {
            return false;
        };
        return Utc::now().date_naive() > due;
    }

    match dates::parse_jira_date(target_end) {
        Some(due) => Utc::now() > due,
        None => false,
    }
}

/// Trending label for a status and target date.
///
/// Overdue wins over everything. Otherwise the finished family collapses
/// to `done`, the not-started family to `not started`, and active or
/// unrecognized statuses keep their normalized name.
pub fn trending(status_name: &str, target_end: &str) -> String {
    if is_overdue(status_name, target_end) {
        return "overdue".to_string();
    }
    match StatusBucket::from_name(status_name) {
        Some(bucket) if bucket.is_done() => "done".to_string(),
        Some(bucket) if bucket.is_not_started() => "not started".to_string(),
        _ => normalize_status(status_name),
    }
}

/// Display emoji honoring the overdue override.
pub fn trending_emoji(status_name: &str, target_end: &str) -> &'static str {
    if is_overdue(status_name, target_end) {
        EMOJI_OFF_TRACK
    } else {
        status_emoji(status_name)
    }
}
