//! Value and row types shared by the loader, the engines and the comparator

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Ordered cells of one row, as text.
///
/// Expected fixtures and actual query results are both compared in this form.
pub type TextRow = Vec<String>;

/// A typed cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

/// A coerced fixture row, ready for insertion.
///
/// Holds only the columns the CSV row actually provided, in header order.
/// Columns missing from a short row are absent and land as NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypedRow {
    pub values: Vec<(String, FieldValue)>,
}

impl TypedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, value: FieldValue) {
        self.values.push((field.into(), value));
    }

    /// Value of a field by normalized name
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
