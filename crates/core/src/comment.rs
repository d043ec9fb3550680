//! Most-recent-comment selection and attachment.
//!
//! Reports show at most one comment per issue: the newest. Selection is a
//! reduction over raw comment payloads; attachment rewrites the records in
//! place from a key-indexed map built by whoever fetched the comments.

use std::collections::HashMap;

use serde_json::Value;

use crate::raw;
use crate::record::{CommentRef, IssueRecord};

/// Pick the most recent comment from a raw comment list.
///
/// "Most recent" is the greatest `created` timestamp compared as a string,
/// which matches chronological order for the tracker's fixed-width format.
/// The first comment wins ties; an empty list yields `None`.
pub fn most_recent_comment(comments: &[Value]) -> Option<&Value> {
    comments.iter().reduce(|latest, candidate| {
        if raw::get_str(candidate, "created") > raw::get_str(latest, "created") {
            candidate
        } else {
            latest
        }
    })
}

/// Deep link to one comment on its issue page.
pub fn comment_permalink(issue_url: &str, comment_id: &str) -> String {
    format!(
        "{issue_url}?focusedId={comment_id}&page=com.atlassian.jira.plugin.system.issuetabpanels%3Acomment-tabpanel#comment-{comment_id}"
    )
}

/// Attach each record's most recent comment from a key-indexed map.
///
/// Records without an entry keep the zero-value comment. The stored
/// timestamp is the comment's `updated` field, so later edits to an old
/// comment still count as recent activity.
pub fn attach_comments(records: &mut [IssueRecord], comments: &HashMap<String, Value>) {
    for record in records.iter_mut() {
        if let Some(comment) = comments.get(&record.key) {
            let comment_id = raw::get_str(comment, "id");
            record.comment = CommentRef {
                url: comment_permalink(&record.url, &comment_id),
                created: raw::get_str(comment, "updated"),
            };
        }
    }
}
