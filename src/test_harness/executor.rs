//! Query execution
//!
//! Runs one test case's query against its freshly loaded scratch table:
//! - substitutes `${TABLE}` with the backquoted table reference
//! - submits the query and waits for the job to finish
//! - drains the result cursor into text rows, in engine order

use super::error::{TestHarnessError, TestHarnessResult};
use super::file_io::read_sql_file;
use super::spec::TestCase;
use super::types::TextRow;
use super::utils::{field_value_to_string, TABLE_PLACEHOLDER};
use crate::engine::{JobStatus, QueryEngine, TableRef};

/// Executes test queries on an engine
pub struct QueryExecutor<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: QueryEngine + ?Sized> QueryExecutor<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Read the test's query, point it at `table` and run it
    pub async fn execute(&self, test: &TestCase, table: &TableRef) -> TestHarnessResult<Vec<TextRow>> {
        let query = read_sql_file(&test.query_file)?;
        let query = substitute_table(&query, table);
        self.run_query(&test.name, &query).await
    }

    /// Run query text and return its rows as text
    pub async fn run_query(&self, test_name: &str, query: &str) -> TestHarnessResult<Vec<TextRow>> {
        let failed = |message: String| TestHarnessError::QueryExecutionFailed {
            test_name: test_name.to_string(),
            message,
        };

        log::debug!("Submitting query for '{}': {}", test_name, query);
        let job = self
            .engine
            .submit_query(query)
            .await
            .map_err(|e| failed(engine_message(e)))?;

        match self.engine.await_job(&job).await {
            Ok(JobStatus::Succeeded) => {}
            Ok(JobStatus::Failed(message)) => return Err(failed(message)),
            Err(e @ TestHarnessError::Timeout { .. }) => return Err(e),
            Err(e) => return Err(failed(engine_message(e))),
        }

        let mut cursor = self.engine.read_results(&job).await?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row().await? {
            rows.push(row.iter().map(field_value_to_string).collect());
        }

        log::info!("Query for '{}' returned {} rows", test_name, rows.len());
        Ok(rows)
    }
}

/// Replace every `${TABLE}` with the backquoted table reference
pub fn substitute_table(query: &str, table: &TableRef) -> String {
    query.replace(TABLE_PLACEHOLDER, &table.quoted())
}

/// The engine's own wording for an error, without harness framing
fn engine_message(err: TestHarnessError) -> String {
    match err {
        TestHarnessError::EngineError { message, .. } => message,
        TestHarnessError::QueryExecutionFailed { message, .. } => message,
        other => other.to_string(),
    }
}
