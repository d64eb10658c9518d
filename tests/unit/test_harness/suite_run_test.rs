//! Suite-level tests on the in-process engine
//!
//! Tests cover:
//! - Loading a suite file and resolving paths against its directory
//! - Running every test and continuing past failures
//! - Scripted query responses, setup statements and test filtering
//! - Report rendering

use super::common::write_file;
use bqtest::engine::memory::QueryResponse;
use bqtest::engine::{InMemoryEngine, TableRef};
use bqtest::test_harness::report::{write_report, OutputFormat};
use bqtest::test_harness::{
    FieldValue, TestHarnessError, TestReport, TestRunner, TestStatus, TestSuite,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const SUITE: &str = r#"
setup:
  - CREATE TEMP FUNCTION double(x INT64) AS (x * 2)
tests:
  - name: passthrough
    query_file: queries/passthrough.sql
    input_file: data/people.csv
    expected_output: data/people_expected.csv
    table_name: people
    schema_overrides:
      id: INTEGER
  - name: totals
    query_file: queries/totals.sql
    input_file: data/orders.csv
    expected_output: data/totals_expected.csv
    table_name: orders
    schema_overrides:
      amount: FLOAT
  - name: wrong_expectation
    query_file: queries/passthrough.sql
    input_file: data/people.csv
    expected_output: data/people_wrong.csv
    table_name: people_again
  - name: bad_fixture
    query_file: queries/passthrough.sql
    input_file: data/bad.csv
    expected_output: data/people_expected.csv
    table_name: bad
    schema_overrides:
      id: INTEGER
"#;

fn write_suite(dir: &Path) -> TestSuite {
    write_file(dir, "queries/passthrough.sql", "SELECT * FROM ${TABLE}\n");
    write_file(
        dir,
        "queries/totals.sql",
        "SELECT customer, SUM(amount) AS total FROM ${TABLE} GROUP BY customer ORDER BY customer",
    );
    write_file(dir, "data/people.csv", "id,name\n1,foo\n2,bar\n");
    write_file(dir, "data/people_expected.csv", "1,foo\n2,bar\n");
    write_file(dir, "data/people_wrong.csv", "1,foo\n2,baz\n");
    write_file(dir, "data/orders.csv", "customer,amount\na,1.5\nb,2\na,3\n");
    write_file(dir, "data/totals_expected.csv", "a,4.5\nb,2\n");
    write_file(dir, "data/bad.csv", "id,name\none,foo\n");
    let suite_path = write_file(dir, "suite.yaml", SUITE);

    let suite = TestSuite::from_file(&suite_path).unwrap();
    suite.validate().unwrap();
    suite
}

async fn scripted_engine() -> Arc<InMemoryEngine> {
    let engine = Arc::new(InMemoryEngine::new());
    engine
        .respond_to("CREATE TEMP FUNCTION", QueryResponse::Rows(Vec::new()))
        .await;
    engine
        .respond_to(
            "SUM(amount)",
            QueryResponse::Rows(vec![
                vec![FieldValue::String("a".to_string()), FieldValue::Float(4.5)],
                vec![FieldValue::String("b".to_string()), FieldValue::Float(2.0)],
            ]),
        )
        .await;
    engine
}

#[test]
fn test_suite_paths_resolve_against_suite_dir() {
    let dir = TempDir::new().unwrap();
    let suite = write_suite(dir.path());

    assert_eq!(suite.base_path.as_deref(), Some(dir.path()));
    assert_eq!(
        suite.tests[0].query_file,
        dir.path().join("queries/passthrough.sql")
    );
    assert_eq!(suite.dataset, "test_dataset");
    assert_eq!(suite.setup.len(), 1);
}

#[tokio::test]
async fn test_full_suite_run() {
    let dir = TempDir::new().unwrap();
    let suite = write_suite(dir.path());
    let engine = scripted_engine().await;

    let runner = TestRunner::new(Arc::clone(&engine), &suite.dataset);
    let report = runner.run_suite(&suite, None).await.unwrap();
    runner.close().await.unwrap();

    let statuses: Vec<(&str, TestStatus)> = report
        .tests
        .iter()
        .map(|t| (t.name.as_str(), t.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("passthrough", TestStatus::Passed),
            ("totals", TestStatus::Passed),
            ("wrong_expectation", TestStatus::Failed),
            ("bad_fixture", TestStatus::Error),
        ]
    );
    assert_eq!(
        report.tests[2].discrepancies,
        vec!["Row 1, Column 1: expected 'baz', got 'bar'".to_string()]
    );
    assert!(report.tests[3]
        .error
        .as_deref()
        .unwrap()
        .contains("Cannot convert 'one' to INTEGER"));

    // bad fixture created its table but inserted nothing
    let bad = TableRef::new("test_dataset", "bad");
    assert!(engine.table_exists(&bad).await);
    assert!(engine.rows(&bad).await.is_empty());

    let queries = engine.submitted_queries().await;
    assert!(queries[0].starts_with("CREATE TEMP FUNCTION"));
    assert!(queries.contains(&"SELECT * FROM `test_dataset.people`;".to_string()));
    assert!(engine.is_closed());
}

#[tokio::test]
async fn test_filter_runs_single_test() {
    let dir = TempDir::new().unwrap();
    let suite = write_suite(dir.path());
    let engine = scripted_engine().await;

    let runner = TestRunner::new(Arc::clone(&engine), &suite.dataset);
    let report = runner.run_suite(&suite, Some("totals")).await.unwrap();

    assert_eq!(report.summary.total, 1);
    assert!(report.all_passed());
    assert!(!engine.table_exists(&TableRef::new("test_dataset", "people")).await);

    let missing = runner.run_suite(&suite, Some("nope")).await;
    assert!(matches!(missing, Err(TestHarnessError::ConfigError { .. })));
}

#[tokio::test]
async fn test_rerun_on_same_engine_errors_on_existing_tables() {
    let dir = TempDir::new().unwrap();
    let suite = write_suite(dir.path());
    let engine = scripted_engine().await;
    let runner = TestRunner::new(Arc::clone(&engine), &suite.dataset);

    runner.run_suite(&suite, Some("passthrough")).await.unwrap();
    let second = runner.run_suite(&suite, Some("passthrough")).await.unwrap();

    assert_eq!(second.tests[0].status, TestStatus::Error);
    assert!(second.tests[0]
        .error
        .as_deref()
        .unwrap()
        .contains("test_dataset.people"));
}

#[tokio::test]
async fn test_query_failure_is_reported_verbatim() {
    let dir = TempDir::new().unwrap();
    let suite = write_suite(dir.path());
    let engine = InMemoryEngine::new();
    engine
        .respond_to("CREATE TEMP FUNCTION", QueryResponse::Rows(Vec::new()))
        .await;
    engine
        .respond_to(
            "SUM(amount)",
            QueryResponse::JobFailure("Unrecognized name: amount at [1:22]".to_string()),
        )
        .await;

    let runner = TestRunner::new(engine, &suite.dataset);
    let report = runner.run_suite(&suite, Some("totals")).await.unwrap();

    assert_eq!(report.tests[0].status, TestStatus::Error);
    assert_eq!(
        report.tests[0].error.as_deref(),
        Some("Query for test 'totals' failed: Unrecognized name: amount at [1:22]")
    );
    assert!(report.tests[0].actual.is_empty());
}

#[tokio::test]
async fn test_json_report_is_parseable() {
    let dir = TempDir::new().unwrap();
    let suite = write_suite(dir.path());
    let runner = TestRunner::new(scripted_engine().await, &suite.dataset);
    let report = runner.run_suite(&suite, None).await.unwrap();

    let mut out = Vec::new();
    write_report(&report, OutputFormat::Json, false, &mut out).unwrap();
    let parsed: TestReport = serde_json::from_slice(&out).unwrap();

    assert_eq!(parsed.summary.total, 4);
    assert_eq!(parsed.summary.passed, 2);
    assert_eq!(parsed.summary.failed, 1);
    assert_eq!(parsed.summary.errors, 1);
    assert!(parsed.suite.ends_with("suite.yaml"));
}
