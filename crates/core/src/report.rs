//! Report assembly: filtering, canonical ordering, and the renderers.
//!
//! Every output format consumes the same filtered, sorted record sequence,
//! so two formats generated from one batch always agree on which issues
//! appear and in what order. Renderers are total string functions apart
//! from JSON, whose structural serialization is the one fallible step.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::dates;
use crate::record::IssueRecord;
use crate::status;

/// Field separator for CSV output, chosen so real-world summaries never
/// collide with it ("cat separated values").
pub const CSV_SEPARATOR: &str = "🐱";

/// Target-date sentinel that sorts after every real date.
const NO_TARGET_SENTINEL: &str = "9999-99-99";

/// Rendering failure.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize report to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Json,
    Csv,
    Slack,
    Url,
}

impl OutputFormat {
    /// Pick the format from the CLI toggles. When several are set at once
    /// the fixed precedence json, csv, slack, url, markdown applies.
    pub fn select(json: bool, csv: bool, slack: bool, url: bool) -> OutputFormat {
        if json {
            Self::Json
        } else if csv {
            Self::Csv
        } else if slack {
            Self::Slack
        } else if url {
            Self::Url
        } else {
            Self::Markdown
        }
    }
}

/// Options shared by the filter stage and the renderers.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Report heading for the markdown format.
    pub title: String,
    /// Whether the records are child issues; adds the parent column.
    pub show_children: bool,
    /// Keep only issues updated at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Drop issues whose most recent comment is after this instant.
    pub no_comment_since: Option<DateTime<Utc>>,
}

/// Apply the activity filters and the canonical four-key ordering.
///
/// With `since` set, records whose `updated` is empty or unparsable are
/// dropped along with the genuinely stale ones. The ordering is total
/// (status priority, then target date with empty last, then raw `updated`,
/// then summary), so re-sorting an already sorted batch changes nothing.
pub fn filter_and_sort(records: &[IssueRecord], options: &ReportOptions) -> Vec<IssueRecord> {
    let mut selected: Vec<IssueRecord> = records
        .iter()
        .filter(|record| keep_record(record, options))
        .cloned()
        .collect();

    selected.sort_by(|a, b| {
        status::status_priority(&a.status)
            .cmp(&status::status_priority(&b.status))
            .then_with(|| sort_target(&a.target_end).cmp(sort_target(&b.target_end)))
            .then_with(|| a.updated.cmp(&b.updated))
            .then_with(|| a.summary.cmp(&b.summary))
    });

    selected
}

fn sort_target(target_end: &str) -> &str {
    if target_end.is_empty() {
        NO_TARGET_SENTINEL
    } else {
        target_end
    }
}

fn keep_record(record: &IssueRecord, options: &ReportOptions) -> bool {
    if let Some(since) = options.since {
        match dates::parse_jira_date(&record.updated) {
            Some(updated) if updated >= since => {}
            _ => return false,
        }
    }

    if let Some(cutoff) = options.no_comment_since {
        if !record.comment.created.is_empty() {
            if let Some(commented) = dates::parse_jira_date(&record.comment.created) {
                if commented > cutoff {
                    return false;
                }
            }
        }
    }

    true
}

/// Filter, sort, and render one report in the requested format.
///
/// `server_url` feeds the deep-link format and is ignored by the rest.
pub fn render(
    format: OutputFormat,
    records: &[IssueRecord],
    options: &ReportOptions,
    server_url: &str,
) -> Result<String, RenderError> {
    let selected = filter_and_sort(records, options);
    Ok(match format {
        OutputFormat::Markdown => render_markdown(&selected, options),
        OutputFormat::Json => render_json(&selected)?,
        OutputFormat::Csv => render_csv(&selected, options),
        OutputFormat::Slack => render_slack(&selected),
        OutputFormat::Url => render_url(server_url, &selected),
    })
}

/// Markdown table with a title, generation timestamp, and row count.
///
/// Expects records already filtered and sorted.
pub fn render_markdown(records: &[IssueRecord], options: &ReportOptions) -> String {
    let mut lines = Vec::with_capacity(records.len() + 6);
    lines.push(format!("\n### {}", options.title));
    lines.push(format!(
        "* generated at: {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    lines.push(format!("* row count: {}", records.len()));

    if options.show_children {
        lines.push("\n| status | parent | issue | assignee | target date | last update |".to_string());
        lines.push("|---|:--|:--|:--|:--|:--|".to_string());
    } else {
        lines.push("\n| status | issue | assignee | target date | last update |".to_string());
        lines.push("|---|:--|:--|:--|:--|".to_string());
    }

    for record in records {
        let status_cell = format!("{} {}", record.emoji, record.trending);
        let issue_link = format!("[{}]({})", record.summary, record.url);
        let target_date = dates::format_date(&record.target_end);
        let last_update =
            dates::format_timestamp_link(&record.comment.created, &record.comment.url, false);

        if options.show_children {
            let parent_link = format!("[{}]({})", record.parent_key, record.parent_url);
            lines.push(format!(
                "| {status_cell} | {parent_link} | {issue_link} | {} | {target_date} | {last_update} |",
                record.assignee
            ));
        } else {
            lines.push(format!(
                "| {status_cell} | {issue_link} | {} | {target_date} | {last_update} |",
                record.assignee
            ));
        }
    }

    lines.push("\n".to_string());
    lines.join("\n")
}

/// Structural JSON serialization of the records, comments included.
pub fn render_json(records: &[IssueRecord]) -> Result<String, RenderError> {
    Ok(serde_json::to_string(records)?)
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(CSV_SEPARATOR) || field.contains('\n') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// CSV with the [`CSV_SEPARATOR`] glyph as delimiter and quote-doubling
/// escapes. Expects records already filtered and sorted.
pub fn render_csv(records: &[IssueRecord], options: &ReportOptions) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);

    let header: &[&str] = if options.show_children {
        &["status", "parent", "issue", "assignee", "target date", "last update"]
    } else {
        &["status", "issue", "assignee", "target date", "last update"]
    };
    lines.push(
        header
            .iter()
            .map(|cell| escape_csv_field(cell))
            .collect::<Vec<_>>()
            .join(CSV_SEPARATOR),
    );

    for record in records {
        let status_cell = format!("{} {}", record.emoji, record.trending);
        let target_date = dates::format_date(&record.target_end);
        let last_update = if record.comment.created.is_empty() {
            "N/A"
        } else {
            &record.comment.created
        };

        let mut cells = vec![escape_csv_field(&status_cell)];
        if options.show_children {
            cells.push(escape_csv_field(&record.parent_key));
        }
        cells.push(escape_csv_field(&record.summary));
        cells.push(escape_csv_field(&record.assignee));
        cells.push(escape_csv_field(&target_date));
        cells.push(escape_csv_field(last_update));
        lines.push(cells.join(CSV_SEPARATOR));
    }

    lines.join("\n")
}

/// Numbered list in Slack markup, one line per issue.
pub fn render_slack(records: &[IssueRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let mut line = format!(
                "{}. {} [{}]({}), (due {})",
                index + 1,
                record.emoji,
                record.summary,
                record.url,
                dates::format_date(&record.target_end)
            );
            if !record.comment.url.is_empty() {
                line.push_str(&format!(" ([last update]({}))", record.comment.url));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One tracker search URL selecting exactly the rendered issues.
///
/// An empty sequence renders as an empty string, since a URL with no keys
/// would select everything instead of nothing.
pub fn render_url(server_url: &str, records: &[IssueRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let keys: Vec<&str> = records.iter().map(|record| record.key.as_str()).collect();
    let jql = format!("key in ({}) order by assignee ASC", keys.join(", "));
    let base = server_url.trim_end_matches('/');
    format!("{base}/issues/?jql={}", urlencoding::encode(&jql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CommentRef;

    const SERVER: &str = "https://jira.example.com";

    fn record(key: &str, status: &str, target_end: &str, updated: &str, summary: &str) -> IssueRecord {
        IssueRecord {
            key: key.to_string(),
            url: format!("{SERVER}/browse/{key}"),
            summary: summary.to_string(),
            status: status.to_string(),
            assignee: "Ada Lovelace".to_string(),
            priority: "High".to_string(),
            created: "2025-01-01T00:00:00.000+0000".to_string(),
            updated: updated.to_string(),
            target_end: target_end.to_string(),
            parent_key: key.to_string(),
            parent_summary: summary.to_string(),
            parent_url: format!("{SERVER}/browse/{key}"),
            trending: status::trending(status, target_end),
            emoji: status::trending_emoji(status, target_end).to_string(),
            comment: CommentRef::default(),
        }
    }

    fn with_comment(mut issue: IssueRecord, url: &str, created: &str) -> IssueRecord {
        issue.comment = CommentRef { url: url.to_string(), created: created.to_string() };
        issue
    }

    fn plain_options() -> ReportOptions {
        ReportOptions { title: "Snippets!".to_string(), ..Default::default() }
    }

    fn since(date: &str) -> Option<DateTime<Utc>> {
        Some(dates::parse_jira_date(date).unwrap().to_utc())
    }

    #[test]
    fn test_sort_puts_in_progress_before_done() {
        let records = vec![
            record("A-1", "done", "", "2025-01-05T00:00:00.000+0000", "finished"),
            record("A-2", "in progress", "", "2025-01-01T00:00:00.000+0000", "active"),
            record("A-3", "new", "", "2025-01-09T00:00:00.000+0000", "queued"),
        ];

        let sorted = filter_and_sort(&records, &plain_options());

        let keys: Vec<&str> = sorted.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A-2", "A-1", "A-3"]);
    }

    #[test]
    fn test_sort_unknown_status_goes_last() {
        let records = vec![
            record("A-1", "quarantined", "", "", "odd one"),
            record("A-2", "new", "", "", "queued"),
        ];

        let sorted = filter_and_sort(&records, &plain_options());

        assert_eq!(sorted[0].key, "A-2");
        assert_eq!(sorted[1].key, "A-1");
    }

    #[test]
    fn test_sort_missing_target_date_goes_after_dated_work() {
        let records = vec![
            record("A-1", "in progress", "", "", "undated"),
            record("A-2", "in progress", "2099-01-15", "", "dated"),
        ];

        let sorted = filter_and_sort(&records, &plain_options());

        assert_eq!(sorted[0].key, "A-2");
        assert_eq!(sorted[1].key, "A-1");
    }

    #[test]
    fn test_sort_breaks_ties_on_updated_then_summary() {
        let records = vec![
            record("A-1", "in progress", "2099-01-15", "2025-02-01T00:00:00.000+0000", "bravo"),
            record("A-2", "in progress", "2099-01-15", "2025-01-01T00:00:00.000+0000", "delta"),
            record("A-3", "in progress", "2099-01-15", "2025-02-01T00:00:00.000+0000", "alpha"),
        ];

        let sorted = filter_and_sort(&records, &plain_options());

        let keys: Vec<&str> = sorted.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A-2", "A-3", "A-1"]);
    }

    #[test]
    fn test_sorting_twice_changes_nothing() {
        let records = vec![
            record("A-1", "done", "2030-01-01", "2025-01-05T00:00:00.000+0000", "one"),
            record("A-2", "blocked", "", "2025-01-02T00:00:00.000+0000", "two"),
            record("A-3", "in progress", "2031-01-01", "2025-01-03T00:00:00.000+0000", "three"),
            record("A-4", "vetting", "", "", "four"),
        ];

        let once = filter_and_sort(&records, &plain_options());
        let twice = filter_and_sort(&once, &plain_options());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_since_filter_keeps_fresh_and_drops_stale_or_unparsable() {
        let records = vec![
            record("A-1", "in progress", "", "2025-03-01T10:00:00.000+0000", "fresh"),
            record("A-2", "in progress", "", "2025-01-01T10:00:00.000+0000", "stale"),
            record("A-3", "in progress", "", "", "no updated"),
            record("A-4", "in progress", "", "not a date", "bad updated"),
        ];
        let options = ReportOptions { since: since("2025-02-01"), ..plain_options() };

        let kept = filter_and_sort(&records, &options);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key, "A-1");
    }

    #[test]
    fn test_since_boundary_keeps_updates_at_the_exact_instant() {
        let records = vec![record("A-1", "in progress", "", "2025-02-01T00:00:00.000+0000", "edge")];
        let options = ReportOptions { since: since("2025-02-01"), ..plain_options() };

        assert_eq!(filter_and_sort(&records, &options).len(), 1);
    }

    #[test]
    fn test_needs_update_filter_drops_recently_commented_issues() {
        let commented = with_comment(
            record("A-1", "in progress", "", "", "chatty"),
            "https://jira.example.com/browse/A-1?focusedId=1",
            "2025-03-10T00:00:00.000+0000",
        );
        let quiet = with_comment(
            record("A-2", "in progress", "", "", "quiet"),
            "https://jira.example.com/browse/A-2?focusedId=2",
            "2025-01-10T00:00:00.000+0000",
        );
        let never_commented = record("A-3", "in progress", "", "", "silent");
        let options = ReportOptions { no_comment_since: since("2025-03-01"), ..plain_options() };

        let kept = filter_and_sort(&[commented, quiet, never_commented], &options);

        let keys: Vec<&str> = kept.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["A-2", "A-3"]);
    }

    #[test]
    fn test_needs_update_filter_keeps_unparsable_comment_dates() {
        let odd = with_comment(record("A-1", "in progress", "", "", "odd"), "https://x", "whenever");
        let options = ReportOptions { no_comment_since: since("2025-03-01"), ..plain_options() };

        assert_eq!(filter_and_sort(&[odd], &options).len(), 1);
    }

    #[test]
    fn test_markdown_report_shape() {
        let records = filter_and_sort(
            &[record("PROJ-1", "in progress", "2099-06-30", "", "Fix the flux capacitor")],
            &plain_options(),
        );

        let report = render_markdown(&records, &plain_options());

        assert!(report.starts_with("\n### Snippets!\n* generated at: "));
        assert!(report.contains("* row count: 1"));
        assert!(report.contains("\n| status | issue | assignee | target date | last update |"));
        assert!(report.contains("|---|:--|:--|:--|:--|"));
        assert!(report.contains(
            "| 🟢 in progress | [Fix the flux capacitor](https://jira.example.com/browse/PROJ-1) | Ada Lovelace | 2099-06-30 | N/A |"
        ));
        assert!(report.ends_with("\n\n"));
    }

    #[test]
    fn test_markdown_report_with_children_adds_parent_column() {
        let mut child = record("PROJ-2", "done", "", "", "Child work");
        child.parent_key = "PROJ-1".to_string();
        child.parent_url = format!("{SERVER}/browse/PROJ-1");
        let options = ReportOptions { show_children: true, ..plain_options() };

        let report = render_markdown(&[child], &options);

        assert!(report.contains("\n| status | parent | issue | assignee | target date | last update |"));
        assert!(report.contains("|---|:--|:--|:--|:--|:--|"));
        assert!(report.contains("| 🟣 done | [PROJ-1](https://jira.example.com/browse/PROJ-1) | [Child work](https://jira.example.com/browse/PROJ-2) | Ada Lovelace | N/A | N/A |"));
    }

    #[test]
    fn test_markdown_report_of_empty_sequence_keeps_header() {
        let report = render_markdown(&[], &plain_options());

        assert!(report.contains("### Snippets!"));
        assert!(report.contains("* row count: 0"));
        assert!(report.contains("| status | issue | assignee | target date | last update |"));
    }

    #[test]
    fn test_json_report_is_a_full_serialization() {
        let records = vec![with_comment(
            record("PROJ-1", "done", "", "2025-01-05T00:00:00.000+0000", "Shipped"),
            "https://jira.example.com/browse/PROJ-1?focusedId=9",
            "2025-01-06T00:00:00.000+0000",
        )];

        let report = render_json(&records).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(parsed[0]["key"], "PROJ-1");
        assert_eq!(parsed[0]["trending"], "done");
        assert_eq!(parsed[0]["comment"]["created"], "2025-01-06T00:00:00.000+0000");
    }

    #[test]
    fn test_json_report_of_empty_sequence_is_an_empty_array() {
        assert_eq!(render_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_json_zero_value_comment_is_serialized_not_omitted() {
        let report = render_json(&[record("PROJ-1", "new", "", "", "quiet")]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(parsed[0]["comment"]["url"], "");
        assert_eq!(parsed[0]["comment"]["created"], "");
    }

    #[test]
    fn test_csv_report_uses_the_cat_separator() {
        let records = vec![record("PROJ-1", "in progress", "2099-06-30", "", "Plain summary")];

        let report = render_csv(&records, &plain_options());
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "status🐱issue🐱assignee🐱target date🐱last update");
        assert_eq!(lines[1], "🟢 in progress🐱Plain summary🐱Ada Lovelace🐱2099-06-30🐱N/A");
    }

    #[test]
    fn test_csv_report_with_children_includes_parent_key() {
        let mut child = record("PROJ-2", "done", "", "", "Child");
        child.parent_key = "PROJ-1".to_string();
        let options = ReportOptions { show_children: true, ..plain_options() };

        let report = render_csv(&[child], &options);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "status🐱parent🐱issue🐱assignee🐱target date🐱last update");
        assert_eq!(lines[1], "🟣 done🐱PROJ-1🐱Child🐱Ada Lovelace🐱N/A🐱N/A");
    }

    // Minimal reader for the custom separator: splits on the glyph and
    // honors quoted fields with doubled quotes.
    fn parse_csv_line(line: &str, separator: char) -> Vec<String> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        field.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    field.push(c);
                }
            } else if c == '"' && field.is_empty() {
                in_quotes = true;
            } else if c == separator {
                fields.push(std::mem::take(&mut field));
            } else {
                field.push(c);
            }
        }
        fields.push(field);
        fields
    }

    #[test]
    fn test_csv_escaping_round_trips_hostile_fields() {
        let summary = "uses 🐱 and \"quotes\"";
        let records = vec![record("PROJ-1", "in progress", "", "", summary)];

        let report = render_csv(&records, &plain_options());
        let separator = CSV_SEPARATOR.chars().next().unwrap();
        let row = parse_csv_line(report.lines().nth(1).unwrap(), separator);

        assert_eq!(row[1], summary);
        assert_eq!(row.len(), 5);
    }

    #[test]
    fn test_slack_report_numbers_lines_and_links_updates() {
        let first = record("PROJ-1", "in progress", "2099-06-30", "", "Active work");
        let second = with_comment(
            record("PROJ-2", "done", "", "", "Finished work"),
            "https://jira.example.com/browse/PROJ-2?focusedId=4",
            "2025-01-06T00:00:00.000+0000",
        );

        let report = render_slack(&[first, second]);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(
            lines[0],
            "1. 🟢 [Active work](https://jira.example.com/browse/PROJ-1), (due 2099-06-30)"
        );
        assert_eq!(
            lines[1],
            "2. 🟣 [Finished work](https://jira.example.com/browse/PROJ-2), (due N/A) ([last update](https://jira.example.com/browse/PROJ-2?focusedId=4))"
        );
    }

    #[test]
    fn test_url_report_selects_exactly_the_rendered_keys() {
        let records = vec![
            record("A-1", "in progress", "", "", "one"),
            record("A-2", "done", "", "", "two"),
            record("A-3", "new", "", "", "three"),
        ];

        let report = render_url(SERVER, &records);

        assert_eq!(
            report,
            "https://jira.example.com/issues/?jql=key%20in%20%28A-1%2C%20A-2%2C%20A-3%29%20order%20by%20assignee%20ASC"
        );
        let encoded = report.split("jql=").nth(1).unwrap();
        assert_eq!(
            urlencoding::decode(encoded).unwrap(),
            "key in (A-1, A-2, A-3) order by assignee ASC"
        );
    }

    #[test]
    fn test_url_report_of_empty_sequence_is_empty() {
        assert_eq!(render_url(SERVER, &[]), "");
    }

    #[test]
    fn test_url_report_trims_trailing_server_slash() {
        let records = vec![record("A-1", "new", "", "", "one")];

        let report = render_url("https://jira.example.com/", &records);

        assert!(report.starts_with("https://jira.example.com/issues/?jql="));
    }

    #[test]
    fn test_format_selection_precedence() {
        assert_eq!(OutputFormat::select(true, true, true, true), OutputFormat::Json);
        assert_eq!(OutputFormat::select(false, true, true, true), OutputFormat::Csv);
        assert_eq!(OutputFormat::select(false, false, true, true), OutputFormat::Slack);
        assert_eq!(OutputFormat::select(false, false, false, true), OutputFormat::Url);
        assert_eq!(OutputFormat::select(false, false, false, false), OutputFormat::Markdown);
    }

    #[test]
    fn test_render_applies_filters_for_every_format() {
        let records = vec![
            record("A-1", "in progress", "", "2025-03-01T10:00:00.000+0000", "fresh"),
            record("A-2", "in progress", "", "2025-01-01T10:00:00.000+0000", "stale"),
        ];
        let options = ReportOptions { since: since("2025-02-01"), ..plain_options() };

        let report = render(OutputFormat::Json, &records, &options, SERVER).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&report).unwrap();

        assert_eq!(parsed.as_array().unwrap().len(), 1);
        assert_eq!(parsed[0]["key"], "A-1");
    }
}
