//! Custom-field catalog resolution.
//!
//! Site-defined Jira fields live under opaque `customfield_NNNNN` IDs, and
//! the IDs differ between deployments. The field catalog endpoint maps
//! display names to IDs; resolution happens once per run and the result is
//! passed explicitly to the normalizer.

use serde_json::Value;

use crate::raw;

/// Display name of the custom field carrying an issue's target date.
pub const TARGET_END_FIELD: &str = "Target end";

/// Custom-field IDs resolved for one report batch.
///
/// The default catalog resolves nothing; records built against it simply
/// carry no target date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog {
    /// Field ID behind [`TARGET_END_FIELD`], when the site defines it.
    pub target_end: Option<String>,
}

impl FieldCatalog {
    /// Resolve the known field names against a raw catalog payload.
    pub fn resolve(raw_fields: &[Value]) -> Self {
        Self {
            target_end: find_field_id(raw_fields, TARGET_END_FIELD),
        }
    }

    /// Resolved field IDs to request on top of the standard field set.
    pub fn extra_field_ids(&self) -> Vec<&str> {
        self.target_end.as_deref().into_iter().collect()
    }
}

/// Exact-name lookup of a custom field ID in a raw catalog payload.
pub fn find_field_id(raw_fields: &[Value], name: &str) -> Option<String> {
    raw_fields
        .iter()
        .find(|field| raw::get_str(field, "name") == name)
        .map(|field| raw::get_str(field, "id"))
        .filter(|id| !id.is_empty())
}
