//! Test runner
//!
//! Owns the engine for the whole run and drives each test case through
//! load → execute → compare, one at a time. A failing test case is recorded
//! and the suite moves on.

use super::comparator::{compare_results, ComparisonOutcome};
use super::error::{TestHarnessError, TestHarnessResult};
use super::executor::QueryExecutor;
use super::file_io::read_csv_file;
use super::loader::FixtureLoader;
use super::report::{ReportGenerator, TestReport};
use super::spec::{TestCase, TestSuite};
use super::types::TextRow;
use crate::engine::QueryEngine;
use std::time::{Duration, Instant};

/// Result of running one test case
#[derive(Debug)]
pub struct TestCaseResult {
    pub name: String,

    pub duration: Duration,

    /// Comparison verdict, or the error that stopped the test case
    pub outcome: TestHarnessResult<ComparisonOutcome>,

    /// Rows the query returned (empty if it never ran)
    pub actual: Vec<TextRow>,

    /// Rows of the expected output file (empty if never read)
    pub expected: Vec<TextRow>,
}

impl TestCaseResult {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(outcome) if outcome.passed)
    }
}

/// Runs test cases against one engine and dataset
pub struct TestRunner<E: QueryEngine> {
    engine: E,
    dataset: String,
}

impl<E: QueryEngine> TestRunner<E> {
    pub fn new(engine: E, dataset: &str) -> Self {
        Self {
            engine,
            dataset: dataset.to_string(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Submit each setup statement in order, stopping at the first failure
    pub async fn run_setup(&self, statements: &[String]) -> TestHarnessResult<()> {
        let executor = QueryExecutor::new(&self.engine);
        for (i, statement) in statements.iter().enumerate() {
            log::info!("Running setup statement {}/{}", i + 1, statements.len());
            executor
                .run_query(&format!("setup #{}", i + 1), statement)
                .await?;
        }
        Ok(())
    }

    /// Run one test case: load its fixture, run its query, compare
    pub async fn run_test(&self, test: &TestCase) -> TestCaseResult {
        log::info!("Running test: {}", test.name);
        let start = Instant::now();

        let mut actual = Vec::new();
        let mut expected = Vec::new();
        let outcome = self.execute_case(test, &mut actual, &mut expected).await;

        match &outcome {
            Ok(o) if o.passed => log::info!("Test '{}' passed", test.name),
            Ok(o) => log::warn!(
                "Test '{}' failed with {} discrepancies",
                test.name,
                o.discrepancies.len()
            ),
            Err(e) => log::error!("Error running test '{}': {}", test.name, e),
        }

        TestCaseResult {
            name: test.name.clone(),
            duration: start.elapsed(),
            outcome,
            actual,
            expected,
        }
    }

    async fn execute_case(
        &self,
        test: &TestCase,
        actual: &mut Vec<TextRow>,
        expected: &mut Vec<TextRow>,
    ) -> TestHarnessResult<ComparisonOutcome> {
        let loader = FixtureLoader::new(&self.engine, &self.dataset);
        let summary = loader.load(test).await?;

        *actual = QueryExecutor::new(&self.engine)
            .execute(test, &summary.table)
            .await?;
        *expected = read_csv_file(&test.expected_output)?;

        Ok(compare_results(actual, expected))
    }

    /// Run a suite, optionally only the test named `only`
    ///
    /// Setup failures abort the run before any test case. Test case failures
    /// are recorded in the report.
    pub async fn run_suite(
        &self,
        suite: &TestSuite,
        only: Option<&str>,
    ) -> TestHarnessResult<TestReport> {
        let tests: Vec<&TestCase> = match only {
            Some(name) => {
                let test = suite
                    .get_test(name)
                    .ok_or_else(|| TestHarnessError::ConfigError {
                        message: format!("No test named '{}' in suite", name),
                    })?;
                vec![test]
            }
            None => suite.tests.iter().collect(),
        };

        let suite_name = suite
            .source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "suite".to_string());
        let mut report = ReportGenerator::new(&suite_name);

        self.run_setup(&suite.setup).await?;

        for test in tests {
            let result = self.run_test(test).await;
            report.add_result(&result);
        }

        Ok(report.generate())
    }

    /// Release the engine
    pub async fn close(self) -> TestHarnessResult<()> {
        log::debug!("Closing {} engine", self.engine.name());
        self.engine.close().await
    }
}
