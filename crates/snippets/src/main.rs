use crate::prelude::*;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{CommandFactory, Parser};
use snippets_core::report::{OutputFormat, ReportOptions};
use std::path::PathBuf;

mod client;
mod prelude;
mod report;

#[derive(Debug, clap::Parser)]
#[command(name = "snippets")]
#[command(version)]
#[command(about = "Generate a status report for Jira issues (and optional subtasks/linked issues)")]
#[command(after_help = "ENVIRONMENT VARIABLES:
  JIRA_SERVER     Jira server URL (required)
  JIRA_API_TOKEN  API token or Personal Access Token (required)
  JIRA_EMAIL      Your email/username (required)

For Jira Cloud (*.atlassian.net):
  export JIRA_SERVER=\"https://mycompany.atlassian.net\"
  export JIRA_EMAIL=\"you@company.com\"
  export JIRA_API_TOKEN=\"<token from id.atlassian.com>\"

For Jira Server/Data Center:
  export JIRA_SERVER=\"https://jira.company.com\"
  export JIRA_API_TOKEN=\"<Personal Access Token from Jira profile>\"

EXAMPLES:
  snippets PROJECT-123 PROJECT-456
  snippets --jql \"project = MYPROJ AND status != Done\"
  snippets --children --since 2025-01-01 PROJECT-123
  snippets --title \"Weekly Status\" -o status.md PROJECT-123 PROJECT-456
  cat issues.txt | snippets --stdin --children -o aggregated.md")]
pub struct App {
    /// Issue keys to report on (e.g. PROJ-123 PROJ-456)
    #[arg(value_name = "ISSUE_KEYS")]
    pub keys: Vec<String>,

    /// JQL query to fetch issues (alternative to specifying keys)
    #[arg(long)]
    pub jql: Option<String>,

    /// Render children (subtasks and linked issues) of the referenced issues
    #[arg(long)]
    pub children: bool,

    /// Only include issues updated on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub since: Option<String>,

    /// Exclude issues with a comment in the past N days (0 = disabled)
    #[arg(long, value_name = "DAYS", default_value_t = 0)]
    pub needs_update: u32,

    /// Custom title for the report
    #[arg(long, default_value = "Snippets!")]
    pub title: String,

    /// Write/append the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    /// Generate a separate report section for each issue
    #[arg(short, long)]
    pub individual: bool,

    /// Read issue keys from stdin (one per line)
    #[arg(short, long)]
    pub stdin: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Output in CSV format ("cat separated values": 🐱)
    #[arg(long)]
    pub csv: bool,

    /// Output as a Slack-formatted numbered list
    #[arg(long)]
    pub slack: bool,

    /// Output a single Jira issues URL with the filtered keys as JQL
    #[arg(long)]
    pub url: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let app = App::parse();

    let default_filter = if app.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    run(app).await
}

async fn run(app: App) -> Result<()> {
    let mut issue_keys = app.keys.clone();
    if app.stdin {
        log::info!("Reading issue keys from stdin...");
        for line in std::io::stdin().lines() {
            let line = line.context("Failed to read issue keys from stdin")?;
            let key = line.trim();
            if !key.is_empty() {
                issue_keys.push(key.to_string());
            }
        }
    }

    if issue_keys.is_empty() && app.jql.is_none() {
        App::command().print_help()?;
        return Err(eyre!("No issue keys or JQL query provided"));
    }

    log::info!("Processing {} issues...", issue_keys.len());

    let since = match &app.since {
        Some(raw_date) => {
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
                .map_err(|_| eyre!("Invalid date format '{}'. Expected YYYY-MM-DD.", raw_date))?;
            let instant = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
            log::info!("Filtering issues updated after {instant}");
            Some(instant)
        }
        None => None,
    };

    let no_comment_since = if app.needs_update > 0 {
        let cutoff = Utc::now() - Duration::days(i64::from(app.needs_update));
        log::info!("Filtering issues with no comment since {cutoff}");
        Some(cutoff)
    } else {
        None
    };

    if let Some(path) = &app.output_file {
        if path.exists() {
            match std::fs::remove_file(path) {
                Ok(()) => log::info!("Removed existing file: {}", path.display()),
                Err(e) => {
                    log::warn!("Could not remove existing file {}: {e}", path.display())
                }
            }
        }
    }

    let config = client::JiraConfig::from_env()?;
    let jira = client::JiraClient::new(&config)?;
    jira.test_connection().await?;
    log::debug!("Connected to Jira server: {}", jira.server());

    let catalog = jira.resolve_fields().await;

    let request = report::ReportRequest {
        options: ReportOptions {
            title: app.title.clone(),
            show_children: app.children,
            since,
            no_comment_since,
        },
        format: OutputFormat::select(app.json, app.csv, app.slack, app.url),
        jql: app.jql.clone(),
        output_file: app.output_file.clone(),
    };

    if app.individual {
        report::generate_individual_reports(&jira, &issue_keys, &request, &catalog).await;
    } else {
        report::generate_report(&jira, &issue_keys, &request, &catalog).await?;
    }

    Ok(())
}
