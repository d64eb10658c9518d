//! Fixture schema inference
//!
//! Derives the scratch-table schema from a CSV fixture:
//! - Column names come from the header row, in header order
//! - Column types come from the test case's `schema_overrides`, else STRING
//! - Names are normalized so the engine accepts them as identifiers

use super::error::{TestHarnessError, TestHarnessResult};
use super::types::TextRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Column types a fixture column can be declared as
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// Text, passthrough
    #[default]
    String,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Float,
    /// Boolean
    Boolean,
    /// Date-time with offset (RFC 3339)
    Timestamp,
    /// Calendar date (YYYY-MM-DD)
    Date,
}

impl FieldType {
    /// Resolve an override token, case-insensitively.
    ///
    /// Unknown tokens resolve to STRING rather than failing.
    pub fn from_token(token: &str) -> Self {
        Self::parse_token(token).unwrap_or(FieldType::String)
    }

    /// Strict variant of [`FieldType::from_token`]; `None` for unknown tokens.
    pub fn parse_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "STRING" => Some(FieldType::String),
            "INTEGER" => Some(FieldType::Integer),
            "FLOAT" => Some(FieldType::Float),
            "BOOLEAN" => Some(FieldType::Boolean),
            "TIMESTAMP" => Some(FieldType::Timestamp),
            "DATE" => Some(FieldType::Date),
            _ => None,
        }
    }

    /// Type name as the engine spells it in table schemas
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "STRING",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Date => "DATE",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of an inferred schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Normalized column name
    pub name: String,

    /// Declared type
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

/// Ordered schema of a scratch table, one field per fixture header column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub fields: Vec<SchemaField>,
}

impl InferredSchema {
    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in column order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Look up a field by normalized name
    pub fn get(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Infer the schema of a fixture from its header row.
///
/// `records` is the whole fixture, header first. `path` is only used for the
/// error message.
pub fn infer_schema(
    records: &[TextRow],
    overrides: &HashMap<String, String>,
    path: &str,
) -> TestHarnessResult<InferredSchema> {
    if records.len() < 2 {
        return Err(TestHarnessError::EmptyFixture {
            path: path.to_string(),
            rows: records.len(),
        });
    }

    let fields = records[0]
        .iter()
        .map(|header| {
            let field_type = match lookup_override(overrides, header) {
                Some(token) => {
                    let resolved = FieldType::from_token(token);
                    if FieldType::parse_token(token).is_none() {
                        log::warn!(
                            "Unrecognized type '{}' for column '{}' in {}, using STRING",
                            token,
                            header,
                            path
                        );
                    }
                    resolved
                }
                None => FieldType::String,
            };
            SchemaField {
                name: normalize_field_name(header),
                field_type,
            }
        })
        .collect();

    Ok(InferredSchema { fields })
}

/// Find the override for a header: exact key first, then case-insensitive.
///
/// When several keys differ only in case, the lexicographically smallest wins.
fn lookup_override<'a>(overrides: &'a HashMap<String, String>, header: &str) -> Option<&'a str> {
    if let Some(token) = overrides.get(header) {
        return Some(token.as_str());
    }
    let mut matches: Vec<(&String, &String)> = overrides
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(header))
        .collect();
    matches.sort();
    if matches.len() > 1 {
        log::warn!(
            "Ambiguous schema overrides for column '{}': {:?}, using '{}'",
            header,
            matches.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>(),
            matches[0].0
        );
    }
    matches.first().map(|(_, token)| token.as_str())
}

/// Force the first character of a column name to uppercase.
pub fn normalize_field_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
