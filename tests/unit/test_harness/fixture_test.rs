//! Unit tests for schema inference, coercion and fixture loading
//!
//! Tests cover:
//! - Schema length and order follow the header
//! - Override precedence and STRING fallback
//! - Coerced values are typed, not text
//! - Empty fixtures and coercion failures insert nothing

use super::common::{grid, write_file};
use bqtest::engine::{InMemoryEngine, TableRef};
use bqtest::test_harness::coercion::coerce_value;
use bqtest::test_harness::{
    infer_schema, FieldType, FieldValue, FixtureLoader, TestCase, TestHarnessError,
};
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use tempfile::TempDir;

fn overrides(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// =============================================================================
// Schema inference
// =============================================================================

#[test]
fn test_schema_matches_header_length_and_order() {
    let fixture = grid(&[&["zeta", "alpha", "mid", "x"], &["1", "2", "3", "4"]]);
    let schema = infer_schema(&fixture, &HashMap::new(), "f.csv").unwrap();

    assert_eq!(schema.len(), 4);
    assert_eq!(schema.field_names(), vec!["Zeta", "Alpha", "Mid", "X"]);
    assert!(schema
        .fields
        .iter()
        .all(|f| f.field_type == FieldType::String));
}

#[test]
fn test_overrides_and_fallback() {
    let fixture = grid(&[
        &["id", "price", "active", "seen_at", "day", "note", "odd"],
        &["1", "2.5", "true", "2024-01-01T00:00:00Z", "2024-01-01", "n", "o"],
    ]);
    let schema = infer_schema(
        &fixture,
        &overrides(&[
            ("id", "integer"),
            ("price", "FLOAT"),
            ("active", "Boolean"),
            ("seen_at", "TIMESTAMP"),
            ("day", "date"),
            ("odd", "DECIMAL"),
        ]),
        "f.csv",
    )
    .unwrap();

    let types: Vec<FieldType> = schema.fields.iter().map(|f| f.field_type).collect();
    assert_eq!(
        types,
        vec![
            FieldType::Integer,
            FieldType::Float,
            FieldType::Boolean,
            FieldType::Timestamp,
            FieldType::Date,
            FieldType::String,
            FieldType::String,
        ]
    );
}

#[test]
fn test_empty_fixture_threshold() {
    let none = infer_schema(&[], &HashMap::new(), "empty.csv");
    assert!(matches!(none, Err(TestHarnessError::EmptyFixture { rows: 0, .. })));

    let header_only = infer_schema(&grid(&[&["a"]]), &HashMap::new(), "h.csv");
    assert!(matches!(
        header_only,
        Err(TestHarnessError::EmptyFixture { rows: 1, .. })
    ));

    let one_row = infer_schema(&grid(&[&["a"], &["1"]]), &HashMap::new(), "r.csv");
    assert!(one_row.is_ok());
}

// =============================================================================
// Coercion
// =============================================================================

#[test]
fn test_coerced_values_are_typed() {
    assert_eq!(
        coerce_value("42", FieldType::Integer, 0).unwrap(),
        FieldValue::Integer(42)
    );
    assert_eq!(
        coerce_value("-7", FieldType::Integer, 0).unwrap(),
        FieldValue::Integer(-7)
    );
    assert_eq!(
        coerce_value("1e3", FieldType::Float, 0).unwrap(),
        FieldValue::Float(1000.0)
    );
    assert_eq!(
        coerce_value("T", FieldType::Boolean, 0).unwrap(),
        FieldValue::Boolean(true)
    );
    assert_eq!(
        coerce_value("0", FieldType::Boolean, 0).unwrap(),
        FieldValue::Boolean(false)
    );
    assert_eq!(
        coerce_value("2024-03-01T12:00:00+02:00", FieldType::Timestamp, 0).unwrap(),
        FieldValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(
        coerce_value("2024-02-29", FieldType::Date, 0).unwrap(),
        FieldValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
    );
    assert_eq!(
        coerce_value(" padded ", FieldType::String, 0).unwrap(),
        FieldValue::String(" padded ".to_string())
    );
}

#[test]
fn test_coercion_failures_name_value_and_column() {
    let cases = [
        ("abc", FieldType::Integer),
        ("9223372036854775808", FieldType::Integer),
        ("1,5", FieldType::Float),
        ("yes", FieldType::Boolean),
        ("2024-01-01 00:00:00", FieldType::Timestamp),
        ("01/02/2024", FieldType::Date),
    ];

    for (raw, field_type) in cases {
        match coerce_value(raw, field_type, 3) {
            Err(TestHarnessError::TypeConversionError { value, column, .. }) => {
                assert_eq!(value, raw);
                assert_eq!(column, 3);
            }
            other => panic!("{} as {} should fail, got {:?}", raw, field_type, other),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

fn case(dir: &TempDir, input: &str, overrides_map: HashMap<String, String>) -> TestCase {
    TestCase {
        name: "load".to_string(),
        query_file: write_file(dir.path(), "q.sql", "SELECT * FROM ${TABLE}"),
        input_file: write_file(dir.path(), "input.csv", input),
        expected_output: write_file(dir.path(), "expected.csv", ""),
        table_name: "events".to_string(),
        schema_overrides: overrides_map,
    }
}

#[tokio::test]
async fn test_load_from_file_stores_typed_rows() {
    let dir = TempDir::new().unwrap();
    let test = case(
        &dir,
        "id,amount,day\n1,9.5,2024-01-02\n2,0.25,2024-01-03\n",
        overrides(&[("id", "INTEGER"), ("amount", "FLOAT"), ("day", "DATE")]),
    );
    let engine = InMemoryEngine::new();

    let summary = FixtureLoader::new(&engine, "test_dataset")
        .load(&test)
        .await
        .unwrap();

    assert_eq!(summary.rows_inserted, 2);
    assert_eq!(summary.table, TableRef::new("test_dataset", "events"));

    let rows = engine.rows(&summary.table).await;
    assert_eq!(rows[1].get("Id"), Some(&FieldValue::Integer(2)));
    assert_eq!(rows[1].get("Amount"), Some(&FieldValue::Float(0.25)));
    assert_eq!(
        rows[0].get("Day"),
        Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
    );
}

#[tokio::test]
async fn test_bad_cell_leaves_table_empty() {
    let dir = TempDir::new().unwrap();
    let test = case(
        &dir,
        "id\n1\n2\nthree\n4\n",
        overrides(&[("id", "INTEGER")]),
    );
    let engine = InMemoryEngine::new();
    let loader = FixtureLoader::new(&engine, "test_dataset");

    match loader.load(&test).await {
        Err(TestHarnessError::TypeConversionError { value, row, .. }) => {
            assert_eq!(value, "three");
            assert_eq!(row, Some(3));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(engine.rows(&loader.table_ref("events")).await.is_empty());
}

#[tokio::test]
async fn test_ragged_rows_are_tolerated() {
    let dir = TempDir::new().unwrap();
    let test = case(&dir, "a,b\n1\n2,3,4\n", HashMap::new());
    let engine = InMemoryEngine::new();

    let summary = FixtureLoader::new(&engine, "test_dataset")
        .load(&test)
        .await
        .unwrap();
    let rows = engine.rows(&summary.table).await;

    assert_eq!(rows[0].len(), 1);
    assert_eq!(rows[0].get("B"), None);
    assert_eq!(rows[1].len(), 2);
    assert_eq!(rows[1].get("B"), Some(&FieldValue::String("3".to_string())));
}

#[tokio::test]
async fn test_missing_input_is_unreadable_source() {
    let dir = TempDir::new().unwrap();
    let mut test = case(&dir, "a\n1\n", HashMap::new());
    test.input_file = dir.path().join("missing.csv");

    let engine = InMemoryEngine::new();
    let result = FixtureLoader::new(&engine, "test_dataset").load(&test).await;

    assert!(matches!(
        result,
        Err(TestHarnessError::UnreadableSource { .. })
    ));
}
