//! Value coercion
//!
//! Converts CSV cell text into typed values according to the inferred schema.
//! A single bad cell fails the whole fixture; nothing is inserted until every
//! row has been coerced.

use super::error::{TestHarnessError, TestHarnessResult};
use super::schema::{FieldType, InferredSchema};
use super::types::{FieldValue, TextRow, TypedRow};
use chrono::{DateTime, NaiveDate, Utc};

/// Coerce one cell to its declared type.
///
/// `column` is the 0-based column index, carried into the error.
pub fn coerce_value(raw: &str, field_type: FieldType, column: usize) -> TestHarnessResult<FieldValue> {
    let fail = || TestHarnessError::TypeConversionError {
        value: raw.to_string(),
        field_type,
        column,
        row: None,
    };

    match field_type {
        FieldType::String => Ok(FieldValue::String(raw.to_string())),
        FieldType::Integer => raw
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| fail()),
        FieldType::Float => raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|_| fail()),
        FieldType::Boolean => parse_bool(raw).map(FieldValue::Boolean).ok_or_else(fail),
        FieldType::Timestamp => DateTime::parse_from_rfc3339(raw)
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
            .map_err(|_| fail()),
        FieldType::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|_| fail()),
    }
}

/// Canonical boolean literals
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Coerce one data row against the schema.
///
/// Values beyond the schema width are dropped; a short row simply yields
/// fewer fields.
pub fn coerce_row(record: &TextRow, schema: &InferredSchema) -> TestHarnessResult<TypedRow> {
    let mut row = TypedRow::new();
    for (column, (raw, field)) in record.iter().zip(schema.fields.iter()).enumerate() {
        let value = coerce_value(raw, field.field_type, column)?;
        row.push(field.name.clone(), value);
    }
    Ok(row)
}

/// Coerce every data row of a fixture into an in-memory batch.
///
/// `data_rows` excludes the header. The first failure aborts with the 1-based
/// data row number attached.
pub fn coerce_rows(data_rows: &[TextRow], schema: &InferredSchema) -> TestHarnessResult<Vec<TypedRow>> {
    let mut batch = Vec::with_capacity(data_rows.len());
    for (index, record) in data_rows.iter().enumerate() {
        if record.len() != schema.len() {
            log::warn!(
                "Fixture row {} has {} values, schema has {} columns",
                index + 1,
                record.len(),
                schema.len()
            );
        }
        let row = coerce_row(record, schema).map_err(|e| match e {
            TestHarnessError::TypeConversionError {
                value,
                field_type,
                column,
                ..
            } => TestHarnessError::TypeConversionError {
                value,
                field_type,
                column,
                row: Some(index + 1),
            },
            other => other,
        })?;
        batch.push(row);
    }
    Ok(batch)
}
