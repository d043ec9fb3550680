//! Accessors over raw tracker payloads.
//!
//! Issue, comment, and field-catalog payloads flow through the pipeline as
//! untyped `serde_json::Value` trees, because Jira's field set varies per
//! deployment and per request. These accessors are total: absent keys and
//! type mismatches yield empty defaults, never panics, so lookups can be
//! chained without intermediate checks.

use serde_json::Value;

static NULL: Value = Value::Null;

/// String field of a JSON object, or `""` when absent or not a string.
pub fn get_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Unsigned integer field, or `0` when absent or not a number.
pub fn get_u64(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Nested object field, or JSON null when absent or not an object.
///
/// Returning null keeps lookups chainable: every accessor applied to null
/// yields its empty default.
pub fn get_map<'a>(value: &'a Value, key: &str) -> &'a Value {
    match value.get(key) {
        Some(nested) if nested.is_object() => nested,
        _ => &NULL,
    }
}

/// Array field as a slice, or empty when absent or not an array.
pub fn get_list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
