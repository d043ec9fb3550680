//! Report generation: fetch orchestration and output writing.
//!
//! The driver owns the batch lifecycle: fetch parents (by key or by
//! query), expand children when asked, attach the most recent comments,
//! then hand the records to the core renderers and write wherever the
//! invocation pointed. The custom-field catalog is resolved once by the
//! caller and shared across every section of a run.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde_json::Value;

use snippets_core::comment;
use snippets_core::fields::FieldCatalog;
use snippets_core::record::{self, extract_issue_data, IssueRecord};
use snippets_core::report::{self, OutputFormat, ReportOptions};

use crate::client::JiraClient;
use crate::prelude::println;
use crate::prelude::*;

/// Upper bound on issues fetched for one JQL-driven report.
const QUERY_CAP: usize = 1000;

/// Everything one report invocation needs besides the client.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub options: ReportOptions,
    pub format: OutputFormat,
    pub jql: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Generate one report for the given issue keys (or the request's JQL
/// query, which takes precedence) and write it out.
pub async fn generate_report(
    client: &JiraClient,
    issue_keys: &[String],
    request: &ReportRequest,
    catalog: &FieldCatalog,
) -> Result<()> {
    log::info!("Generating report titled '{}'", request.options.title);

    let mut parents = match &request.jql {
        Some(jql) => fetch_parents_from_query(client, jql, catalog).await?,
        None => fetch_parents_by_key(client, issue_keys, catalog).await,
    };

    let mut children = Vec::new();
    if request.options.show_children {
        for parent in &parents {
            children.extend(fetch_children(client, parent, catalog).await);
        }
    }

    let all_keys: Vec<String> = parents
        .iter()
        .chain(children.iter())
        .map(|issue| issue.key.clone())
        .collect();
    let comments = client.most_recent_comments(&all_keys).await?;
    comment::attach_comments(&mut parents, &comments);
    comment::attach_comments(&mut children, &comments);

    let records = if request.options.show_children { children } else { parents };
    log::info!("Rendering report for {} issues", records.len());
    let rendered = report::render(request.format, &records, &request.options, client.server())?;

    write_report(request.output_file.as_deref(), &rendered)
}

/// Generate one report section per key, logging sections that fail and
/// moving on so one bad section cannot sink the rest of the run.
pub async fn generate_individual_reports(
    client: &JiraClient,
    issue_keys: &[String],
    request: &ReportRequest,
    catalog: &FieldCatalog,
) {
    for key in issue_keys {
        if let Err(e) = generate_report(client, std::slice::from_ref(key), request, catalog).await
        {
            log::error!("Failed to generate report for {key}: {e}");
        }
    }
}

async fn fetch_parents_from_query(
    client: &JiraClient,
    jql: &str,
    catalog: &FieldCatalog,
) -> Result<Vec<IssueRecord>> {
    log::info!("Executing JQL query: {jql}");
    let payloads = client.search_issues(jql, QUERY_CAP, catalog).await?;
    let issues: Vec<IssueRecord> = payloads
        .iter()
        .map(|payload| extract_issue_data(payload, client.server(), None, None, catalog))
        .collect();
    log::info!("Found {} issues from JQL query", issues.len());
    Ok(issues)
}

/// Fetch each key individually, skipping the ones that fail so a single
/// bad key cannot sink the whole batch.
async fn fetch_parents_by_key(
    client: &JiraClient,
    issue_keys: &[String],
    catalog: &FieldCatalog,
) -> Vec<IssueRecord> {
    let mut parents = Vec::with_capacity(issue_keys.len());
    for key in issue_keys {
        log::info!("Fetching one issue: {key}");
        match client.get_issue(key, catalog).await {
            Ok(payload) => {
                parents.push(extract_issue_data(&payload, client.server(), None, None, catalog));
            }
            Err(e) => log::warn!("Failed to fetch issue {key}: {e}"),
        }
    }
    parents
}

/// Fetch a parent's children: its subtasks and linked issues.
///
/// The parent payload from the original fetch may have come from a search,
/// which omits hierarchy fields, so the parent is re-fetched here.
async fn fetch_children(
    client: &JiraClient,
    parent: &IssueRecord,
    catalog: &FieldCatalog,
) -> Vec<IssueRecord> {
    let payload: Value = match client.get_issue(&parent.key, catalog).await {
        Ok(payload) => payload,
        Err(e) => {
            log::warn!("Failed to expand children of {}: {e}", parent.key);
            return Vec::new();
        }
    };

    let mut children = Vec::new();
    for key in record::child_issue_keys(&payload) {
        match client.get_issue(&key, catalog).await {
            Ok(child) => children.push(extract_issue_data(
                &child,
                client.server(),
                Some(&parent.key),
                Some(&parent.summary),
                catalog,
            )),
            Err(e) => log::warn!("Failed to fetch child issue {key}: {e}"),
        }
    }
    log::info!("Found {} children for {}", children.len(), parent.key);
    children
}

/// Write the rendered report to stdout, or append it to `path`.
///
/// Appended sections are separated by four newlines so consecutive reports
/// in one file stay visually distinct. If the file cannot be opened the
/// report falls back to stdout rather than being lost.
pub fn write_report(path: Option<&Path>, rendered: &str) -> Result<()> {
    let Some(path) = path else {
        println!("{rendered}");
        return Ok(());
    };

    let mut file = match OpenOptions::new().append(true).create(true).open(path) {
        Ok(file) => file,
        Err(e) => {
            log::warn!("Error opening file {}: {e}; writing to stdout", path.display());
            println!("{rendered}");
            return Ok(());
        }
    };

    let existing_len = file.metadata().map(|meta| meta.len()).unwrap_or(0);
    if existing_len > 0 {
        file.write_all(b"\n\n\n\n")
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    }
    file.write_all(rendered.as_bytes())
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    Ok(())
}
