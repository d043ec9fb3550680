//! Canonical issue record and the payload normalizer.
//!
//! [`extract_issue_data`] is the single entry point that turns one raw
//! issue payload into the flat [`IssueRecord`] every later stage consumes.
//! Normalization never fails: missing fields degrade to sentinel values so
//! one sparse issue cannot take down a whole report.

use serde::Serialize;
use serde_json::Value;

use crate::fields::FieldCatalog;
use crate::raw;
use crate::status;

/// Reference to the most recent comment on an issue.
///
/// The zero value (both fields empty) means "no comments yet". It still
/// serializes into structural reports so the record shape stays stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommentRef {
    pub url: String,
    pub created: String,
}

impl CommentRef {
    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.created.is_empty()
    }
}

/// One issue, normalized for reporting.
///
/// String fields carry sentinel fallbacks rather than options: `N/A` for a
/// missing assignee, `None` for a missing priority, `unknown` for a
/// missing status, and `""` for absent dates. A top-level issue is its own
/// parent, so the parent columns are always renderable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRecord {
    pub key: String,
    pub url: String,
    pub summary: String,
    pub status: String,
    pub assignee: String,
    pub priority: String,
    pub created: String,
    pub updated: String,
    pub target_end: String,
    pub parent_key: String,
    pub parent_summary: String,
    pub parent_url: String,
    pub trending: String,
    pub emoji: String,
    pub comment: CommentRef,
}

/// Build a canonical record from one raw issue payload.
///
/// Pass `None` for the parent arguments when the issue is reported at the
/// top level; it then becomes its own parent. The status name is stored
/// normalized (trimmed, lowercased), and trending plus emoji are derived
/// here so renderers never re-classify.
pub fn extract_issue_data(
    issue: &Value,
    server_url: &str,
    parent_key: Option<&str>,
    parent_summary: Option<&str>,
    catalog: &FieldCatalog,
) -> IssueRecord {
    let fields = raw::get_map(issue, "fields");
    let key = raw::get_str(issue, "key");

    let mut status = raw::get_str(raw::get_map(fields, "status"), "name");
    if status.is_empty() {
        status = "Unknown".to_string();
    }
    let status = status::normalize_status(&status);

    let mut assignee = raw::get_str(raw::get_map(fields, "assignee"), "displayName");
    if assignee.is_empty() {
        assignee = "N/A".to_string();
    }

    let mut priority = raw::get_str(raw::get_map(fields, "priority"), "name");
    if priority.is_empty() {
        priority = "None".to_string();
    }

    let created = raw::get_str(fields, "created");
    let updated = raw::get_str(fields, "updated");

    let target_end = match &catalog.target_end {
        Some(field_id) => raw::get_str(fields, field_id),
        None => String::new(),
    };

    let summary = raw::get_str(fields, "summary");
    let url = format!("{server_url}/browse/{key}");

    let parent_key = match parent_key {
        Some(parent) if !parent.is_empty() => parent.to_string(),
        _ => key.clone(),
    };
    let parent_summary = match parent_summary {
        Some(parent) if !parent.is_empty() => parent.to_string(),
        _ => summary.clone(),
    };
    let parent_url = if parent_key == key {
        url.clone()
    } else {
        format!("{server_url}/browse/{parent_key}")
    };

    let trending = status::trending(&status, &target_end);
    let emoji = status::trending_emoji(&status, &target_end).to_string();

    IssueRecord {
        key,
        url,
        summary,
        status,
        assignee,
        priority,
        created,
        updated,
        target_end,
        parent_key,
        parent_summary,
        parent_url,
        trending,
        emoji,
        comment: CommentRef::default(),
    }
}

/// Child issue keys of a raw issue payload: subtasks first, then linked
/// issues, taking the outward side of each link and falling back to the
/// inward side. Entries without a key are skipped.
pub fn child_issue_keys(issue: &Value) -> Vec<String> {
    let fields = raw::get_map(issue, "fields");
    let mut keys = Vec::new();

    for subtask in raw::get_list(fields, "subtasks") {
        let key = raw::get_str(subtask, "key");
        if !key.is_empty() {
            keys.push(key);
        }
    }

    for link in raw::get_list(fields, "issuelinks") {
        let mut linked = raw::get_map(link, "outwardIssue");
        if linked.is_null() {
            linked = raw::get_map(link, "inwardIssue");
        }
        let key = raw::get_str(linked, "key");
        if !key.is_empty() {
            keys.push(key);
        }
    }

    keys
}
