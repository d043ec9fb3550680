//! Core library for snippets
//!
//! This crate implements the **Functional Core** of the snippets report
//! generator, following the Functional Core - Imperative Shell architectural
//! pattern.
//!
//! # Architecture Overview
//!
//! The snippets project uses a two-crate architecture to enforce separation
//! of concerns:
//!
//! - **`snippets_core`** (this crate): Pure transformation functions with zero I/O
//! - **`snippets`**: Jira fetches, CLI handling, and output writing (the
//!   Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output (a few
//!   compare against the current clock, which is the one ambient input)
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Total over raw data**: Missing or mistyped payload fields degrade to
//!   sentinel values instead of panicking
//! - **Testable**: Can be tested with simple fixture payloads, no mocking
//!   required
//!
//! # Module Organization
//!
//! The pipeline runs raw payload to rendered report, and the modules follow
//! that flow:
//!
//! - [`raw`]: Total accessors over untyped tracker payloads
//! - [`dates`]: Timestamp parsing and display formatting
//! - [`fields`]: Custom-field catalog resolution
//! - [`status`]: Status classification, overdue checks, trending
//! - [`record`]: The canonical issue record and its normalizer
//! - [`comment`]: Most-recent-comment selection and attachment
//! - [`pagination`]: Page-window accounting for offset-based search
//! - [`report`]: Filtering, canonical ordering, and the report renderers
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use snippets_core::fields::FieldCatalog;
//! use snippets_core::record::extract_issue_data;
//! use snippets_core::report::{self, OutputFormat, ReportOptions};
//!
//! // Create fixture data (no HTTP required)
//! let payload = serde_json::json!({
//!     "key": "PROJ-1",
//!     "fields": {"summary": "Ship it", "status": {"name": "In Progress"}}
//! });
//!
//! // Transform using pure functions
//! let record = extract_issue_data(&payload, "https://jira.example.com", None, None, &FieldCatalog::default());
//! let output = report::render(OutputFormat::Markdown, &[record], &ReportOptions::default(), "https://jira.example.com")?;
//! ```
//!
//! # Pattern Reference
//!
//! This architecture is based on Gary Bernhardt's Functional Core, Imperative
//! Shell pattern. The key insight: **data transformation logic should be pure
//! and ignorant of where data comes from or where it goes**.

pub mod comment;
pub mod dates;
pub mod fields;
pub mod pagination;
pub mod raw;
pub mod record;
pub mod report;
pub mod status;
