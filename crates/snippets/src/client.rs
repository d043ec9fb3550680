//! Jira REST collaborator: configuration, authentication, and fetches.
//!
//! Everything that talks to the network lives here. Responses are handed
//! to the core crate as raw `serde_json::Value` payloads; this module does
//! no issue interpretation of its own.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use snippets_core::comment;
use snippets_core::fields::FieldCatalog;
use snippets_core::pagination;
use snippets_core::raw;

use crate::prelude::*;

/// Standard issue fields requested for report rows.
const ISSUE_FIELDS: &str = "summary,status,assignee,priority,created,updated";

/// Extra fields requested when fetching one issue, so children can be
/// expanded from the payload.
const HIERARCHY_FIELDS: &str = "subtasks,issuelinks";

/// Jira endpoint and credentials from environment variables.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub server: String,
    pub email: String,
    pub api_token: String,
}

impl JiraConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server: std::env::var("JIRA_SERVER").map_err(|_| {
                eyre!("JIRA_SERVER environment variable not set (e.g. export JIRA_SERVER=https://mycompany.atlassian.net)")
            })?,
            email: std::env::var("JIRA_EMAIL").map_err(|_| {
                eyre!("JIRA_EMAIL environment variable not set (e.g. export JIRA_EMAIL=you@company.com)")
            })?,
            api_token: std::env::var("JIRA_API_TOKEN").map_err(|_| {
                eyre!("JIRA_API_TOKEN environment variable not set (e.g. export JIRA_API_TOKEN=your-token)")
            })?,
        })
    }
}

/// Authenticated Jira REST client.
///
/// The deployment flavor is detected from the server URL: `*.atlassian.net`
/// means Cloud (API v3, Basic auth with email and token), anything else is
/// treated as Server/Data Center (API v2, Bearer PAT).
pub struct JiraClient {
    server: String,
    api_version: &'static str,
    http: reqwest::Client,
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Result<Self> {
        use base64::Engine;
        use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};

        let server = config.server.trim_end_matches('/').to_string();
        let is_cloud = server.to_lowercase().contains(".atlassian.net");
        if is_cloud && config.email.is_empty() {
            return Err(eyre!("JIRA_EMAIL is required for Jira Cloud authentication"));
        }

        let authorization = if is_cloud {
            let auth_string = format!("{}:{}", config.email, config.api_token);
            let auth_encoded = base64::engine::general_purpose::STANDARD.encode(&auth_string);
            format!("Basic {auth_encoded}")
        } else {
            format!("Bearer {}", config.api_token)
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&authorization)
                .map_err(|e| eyre!("Invalid header value: {}", e))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_version = if is_cloud { "3" } else { "2" };
        log::debug!(
            "Using Jira {} authentication (API v{})",
            if is_cloud { "Cloud" } else { "Server/Data Center" },
            api_version
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self { server, api_version, http })
    }

    /// Server base URL with any trailing slash removed.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Verify credentials with a cheap authenticated call.
    pub async fn test_connection(&self) -> Result<()> {
        self.get_json("myself", &[]).await.map(|_| ()).context(
            "Failed to connect to Jira. Check your credentials and server URL.\n\
             For Jira Server/Data Center, ensure you're using a valid Personal Access Token (PAT)",
        )
    }

    /// Resolve the custom-field catalog, once per run.
    ///
    /// Catalog failures degrade to the empty catalog instead of failing the
    /// report; records then carry no target date.
    pub async fn resolve_fields(&self) -> FieldCatalog {
        match self.get_json_list("field", &[]).await {
            Ok(raw_fields) => FieldCatalog::resolve(&raw_fields),
            Err(e) => {
                log::warn!("Could not load custom fields: {e}");
                FieldCatalog::default()
            }
        }
    }

    /// Fetch one issue with the report fields plus hierarchy links.
    pub async fn get_issue(&self, issue_key: &str, catalog: &FieldCatalog) -> Result<Value> {
        let mut fields = format!("{ISSUE_FIELDS},{HIERARCHY_FIELDS}");
        for field_id in catalog.extra_field_ids() {
            fields.push(',');
            fields.push_str(field_id);
        }
        let endpoint = format!("issue/{}", urlencoding::encode(issue_key));
        self.get_json(&endpoint, &[("fields", fields.as_str())]).await
    }

    /// Run a JQL search, paginating until `cap` issues or exhaustion.
    pub async fn search_issues(
        &self,
        jql: &str,
        cap: usize,
        catalog: &FieldCatalog,
    ) -> Result<Vec<Value>> {
        let mut fields = ISSUE_FIELDS.to_string();
        for field_id in catalog.extra_field_ids() {
            fields.push(',');
            fields.push_str(field_id);
        }

        let mut all_issues: Vec<Value> = Vec::new();
        let mut window = pagination::first_window(cap);
        loop {
            log::debug!(
                "Fetching issues: start_at={}, max_results={}",
                window.start_at,
                window.max_results
            );
            let start_at = window.start_at.to_string();
            let max_results = window.max_results.to_string();
            let response = self
                .get_json(
                    "search",
                    &[
                        ("jql", jql),
                        ("fields", fields.as_str()),
                        ("startAt", start_at.as_str()),
                        ("maxResults", max_results.as_str()),
                    ],
                )
                .await?;

            let page = raw::get_list(&response, "issues");
            let page_len = page.len();
            let server_total = raw::get_u64(&response, "total") as usize;
            all_issues.extend(page.iter().cloned());
            log::debug!(
                "Fetched {page_len} issues (total so far: {}, server total: {server_total})",
                all_issues.len()
            );

            match pagination::next_window(window, all_issues.len(), page_len, server_total, cap) {
                Some(next) => window = next,
                None => break,
            }
        }

        log::info!("Fetched {} issues total", all_issues.len());
        all_issues.truncate(cap);
        Ok(all_issues)
    }

    /// All comments on one issue.
    pub async fn get_comments(&self, issue_key: &str) -> Result<Vec<Value>> {
        let endpoint = format!("issue/{}/comment", urlencoding::encode(issue_key));
        let response = self.get_json(&endpoint, &[]).await?;
        Ok(raw::get_list(&response, "comments").to_vec())
    }

    /// Most recent comment per issue key. Issues without comments are
    /// omitted. Multiple keys are fetched with a single search request on
    /// the comment field; a lone key uses the comment endpoint directly.
    pub async fn most_recent_comments(
        &self,
        issue_keys: &[String],
    ) -> Result<HashMap<String, Value>> {
        let mut result = HashMap::with_capacity(issue_keys.len());

        match issue_keys {
            [] => {}
            [key] => {
                let comments = self.get_comments(key).await?;
                if let Some(latest) = comment::most_recent_comment(&comments) {
                    result.insert(key.clone(), latest.clone());
                }
            }
            keys => {
                let quoted: Vec<String> = keys.iter().map(|key| format!("\"{key}\"")).collect();
                let jql = format!("key in ({})", quoted.join(","));
                let max_results = keys.len().to_string();
                let response = self
                    .get_json(
                        "search",
                        &[
                            ("jql", jql.as_str()),
                            ("fields", "comment"),
                            ("maxResults", max_results.as_str()),
                        ],
                    )
                    .await?;

                for issue in raw::get_list(&response, "issues") {
                    let key = raw::get_str(issue, "key");
                    let comment_field = raw::get_map(raw::get_map(issue, "fields"), "comment");
                    let comments = raw::get_list(comment_field, "comments");
                    if let Some(latest) = comment::most_recent_comment(comments) {
                        result.insert(key, latest.clone());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Authenticated GET returning the parsed JSON body.
    async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!(
            "{}/rest/api/{}/{}",
            self.server,
            self.api_version,
            endpoint.trim_start_matches('/')
        );
        log::debug!("Request: GET {url}");

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| eyre!("Request to Jira failed: {}", e))?;

        let status = response.status();
        log::debug!("Response: {status}");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Jira API error [{}]: {}", status, truncate(&body, 500)));
        }

        response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse Jira response: {}", e))
    }

    /// Authenticated GET for endpoints that return a top-level JSON array.
    async fn get_json_list(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let body = self.get_json(endpoint, params).await?;
        body.as_array()
            .cloned()
            .ok_or_else(|| eyre!("Expected a JSON array from {}", endpoint))
    }
}

/// First `max_len` bytes of `s`, backing off to a character boundary.
fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
