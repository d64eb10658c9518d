//! Integration tests against the BigQuery emulator
//!
//! These tests start `ghcr.io/goccy/bigquery-emulator` via testcontainers and
//! drive the harness through the REST client.
//!
//! Set `SKIP_DOCKER_TESTS=1` to skip them.

use bqtest::engine::{BigQueryClient, QueryEngine, TableRef};
use bqtest::test_harness::infra::EmulatorInfra;
use bqtest::test_harness::{TestHarnessError, TestRunner, TestStatus, TestSuite};
use std::path::Path;
use tempfile::TempDir;

fn skip_docker() -> bool {
    if std::env::var("SKIP_DOCKER_TESTS").is_ok() {
        println!("Skipping Docker test (SKIP_DOCKER_TESTS is set)");
        return true;
    }
    false
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

async fn start_emulator() -> Option<EmulatorInfra> {
    match EmulatorInfra::start().await {
        Ok(infra) => Some(infra),
        Err(e) => {
            // Docker might not be available in CI
            println!("Skipping test - emulator not available: {}", e);
            None
        }
    }
}

#[tokio::test]
async fn test_suite_against_emulator() {
    if skip_docker() {
        return;
    }
    let Some(infra) = start_emulator().await else {
        return;
    };

    let dir = TempDir::new().unwrap();
    write(dir.path(), "passthrough.sql", "SELECT Id, Name FROM ${TABLE} ORDER BY Id");
    write(
        dir.path(),
        "count.sql",
        "SELECT COUNT(*) AS n FROM ${TABLE} WHERE Active",
    );
    write(dir.path(), "people.csv", "id,name,active\n1,foo,true\n2,bar,false\n");
    write(dir.path(), "people_expected.csv", "1,foo\n2,bar\n");
    write(dir.path(), "count_expected.csv", "1\n");
    write(
        dir.path(),
        "suite.yaml",
        r#"
tests:
  - name: passthrough
    query_file: passthrough.sql
    input_file: people.csv
    expected_output: people_expected.csv
    table_name: people
    schema_overrides:
      id: INTEGER
      active: BOOLEAN
  - name: count_active
    query_file: count.sql
    input_file: people.csv
    expected_output: count_expected.csv
    table_name: people_count
    schema_overrides:
      id: INTEGER
      active: BOOLEAN
"#,
    );

    let suite = TestSuite::from_file(dir.path().join("suite.yaml")).unwrap();
    suite.validate().unwrap();

    let client = BigQueryClient::new(infra.engine_config()).unwrap();
    let runner = TestRunner::new(client, &suite.dataset);
    let report = runner.run_suite(&suite, None).await;
    runner.close().await.unwrap();
    let report = report.unwrap();

    for test in &report.tests {
        assert_eq!(
            test.status,
            TestStatus::Passed,
            "{}: {:?} {:?}",
            test.name,
            test.error,
            test.discrepancies
        );
    }

    infra.stop().await;
}

#[tokio::test]
async fn test_existing_table_is_reported() {
    if skip_docker() {
        return;
    }
    let Some(infra) = start_emulator().await else {
        return;
    };

    let client = BigQueryClient::new(infra.engine_config()).unwrap();
    client.create_dataset("dup_dataset").await.unwrap();
    assert!(matches!(
        client.create_dataset("dup_dataset").await,
        Err(TestHarnessError::DatasetAlreadyExists { .. })
    ));

    let schema = bqtest::test_harness::infer_schema(
        &[vec!["a".to_string()], vec!["1".to_string()]],
        &Default::default(),
        "inline",
    )
    .unwrap();
    let table = TableRef::new("dup_dataset", "t");
    client.create_table(&table, &schema).await.unwrap();
    assert!(matches!(
        client.create_table(&table, &schema).await,
        Err(TestHarnessError::TableAlreadyExists { .. })
    ));

    infra.stop().await;
}
