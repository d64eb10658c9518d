//! Shared utilities for the test harness
//!
//! Contains helpers used across multiple harness modules:
//! - FieldValue formatting and conversion
//! - Path resolution
//! - Common constants

use super::types::{FieldValue, TypedRow};
use std::path::{Path, PathBuf};

// ==================== Constants ====================

/// Placeholder in query text that is replaced with the scratch table reference
pub const TABLE_PLACEHOLDER: &str = "${TABLE}";

/// Dataset used for scratch tables when the suite does not name one
pub const DEFAULT_DATASET: &str = "test_dataset";

/// Text rendered for NULL cells
pub const NULL_TEXT: &str = "NULL";

// ==================== FieldValue Utilities ====================

/// Convert a FieldValue to its canonical string representation
///
/// Every result cell goes through this before comparison, whatever its
/// underlying type.
pub fn field_value_to_string(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => NULL_TEXT.to_string(),
        FieldValue::String(s) => s.clone(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Timestamp(ts) => ts.to_string(),
        FieldValue::Date(d) => d.to_string(),
    }
}

/// Convert a FieldValue to the JSON form used for streaming inserts
pub fn field_value_to_json(value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Null => serde_json::Value::Null,
        FieldValue::String(s) => serde_json::Value::String(s.clone()),
        // INT64 travels as a string so values beyond 2^53 survive JSON
        FieldValue::Integer(i) => serde_json::Value::String(i.to_string()),
        FieldValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(f.to_string())),
        FieldValue::Boolean(b) => serde_json::Value::Bool(*b),
        FieldValue::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
        FieldValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
    }
}

/// Convert a typed row to a JSON object keyed by field name
pub fn typed_row_to_json(row: &TypedRow) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = row
        .values
        .iter()
        .map(|(name, value)| (name.clone(), field_value_to_json(value)))
        .collect();
    serde_json::Value::Object(map)
}

// ==================== Path Utilities ====================

/// Join a relative path onto `base_dir`; absolute paths pass through
pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Directory containing `file_path`, `.` for a bare file name
pub fn get_base_dir(file_path: &Path) -> PathBuf {
    match file_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
