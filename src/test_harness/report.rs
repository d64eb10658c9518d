//! Test report generation
//!
//! Collects per-test results into a run report and renders it as:
//! - Text (human-readable console output)
//! - JSON (machine-readable)

use super::runner::TestCaseResult;
use super::types::TextRow;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Complete test run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    /// Suite file the run came from
    pub suite: String,

    /// Run ID
    pub run_id: String,

    /// Start time (ISO 8601)
    pub start_time: String,

    /// End time (ISO 8601)
    pub end_time: String,

    /// Total duration in milliseconds
    pub duration_ms: u64,

    pub summary: TestSummary,

    /// Per-test results, in run order
    pub tests: Vec<TestCaseReport>,
}

impl TestReport {
    /// True when no test failed or errored
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0 && self.summary.errors == 0
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    /// Tests whose results differed from the expected output
    pub failed: usize,
    /// Tests stopped by an error before comparison
    pub errors: usize,
}

/// Report for a single test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseReport {
    pub name: String,

    pub status: TestStatus,

    /// Execution time in milliseconds
    pub duration_ms: u64,

    /// Error message if the test errored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Discrepancy messages, in discovery order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discrepancies: Vec<String>,

    pub actual: Vec<TextRow>,

    pub expected: Vec<TextRow>,
}

/// Test case status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Error,
}

impl From<&TestCaseResult> for TestCaseReport {
    fn from(result: &TestCaseResult) -> Self {
        let (status, error, discrepancies) = match &result.outcome {
            Ok(outcome) if outcome.passed => (TestStatus::Passed, None, Vec::new()),
            Ok(outcome) => (TestStatus::Failed, None, outcome.messages()),
            Err(e) => (TestStatus::Error, Some(e.to_string()), Vec::new()),
        };

        Self {
            name: result.name.clone(),
            status,
            duration_ms: result.duration.as_millis() as u64,
            error,
            discrepancies,
            actual: result.actual.clone(),
            expected: result.expected.clone(),
        }
    }
}

/// Report generator
pub struct ReportGenerator {
    suite: String,
    run_id: String,
    tests: Vec<TestCaseReport>,
    start_time: chrono::DateTime<chrono::Utc>,
}

impl ReportGenerator {
    pub fn new(suite: &str) -> Self {
        Self {
            suite: suite.to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            tests: Vec::new(),
            start_time: chrono::Utc::now(),
        }
    }

    /// Add a test case result
    pub fn add_result(&mut self, result: &TestCaseResult) {
        self.tests.push(TestCaseReport::from(result));
    }

    /// Generate final report
    pub fn generate(&self) -> TestReport {
        let end_time = chrono::Utc::now();
        let duration = end_time - self.start_time;

        TestReport {
            suite: self.suite.clone(),
            run_id: self.run_id.clone(),
            start_time: self.start_time.to_rfc3339(),
            end_time: end_time.to_rfc3339(),
            duration_ms: duration.num_milliseconds().max(0) as u64,
            summary: self.calculate_summary(),
            tests: self.tests.clone(),
        }
    }

    fn calculate_summary(&self) -> TestSummary {
        let count = |status| self.tests.iter().filter(|t| t.status == status).count();

        TestSummary {
            total: self.tests.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            errors: count(TestStatus::Error),
        }
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Write report to output. `verbose` adds the actual and expected grids to
/// text output.
pub fn write_report(
    report: &TestReport,
    format: OutputFormat,
    verbose: bool,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => write_text_report(report, verbose, writer),
        OutputFormat::Json => write_json_report(report, writer),
    }
}

fn write_text_report(
    report: &TestReport,
    verbose: bool,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(writer, "\nBigQuery SQL Test Report")?;
    writeln!(writer, "========================")?;
    writeln!(writer, "Suite: {}", report.suite)?;
    writeln!(writer, "Run ID: {}", report.run_id)?;
    writeln!(writer, "Duration: {}ms", report.duration_ms)?;

    for test in &report.tests {
        let label = match test.status {
            TestStatus::Passed => "PASS",
            TestStatus::Failed => "FAIL",
            TestStatus::Error => "ERROR",
        };
        writeln!(writer, "\n[{}] {} ({}ms)", label, test.name, test.duration_ms)?;

        if let Some(ref error) = test.error {
            writeln!(writer, "   {}", error)?;
        }
        for discrepancy in &test.discrepancies {
            writeln!(writer, "   {}", discrepancy)?;
        }

        if verbose && test.status != TestStatus::Error {
            writeln!(writer, "   Actual results:")?;
            write_grid(&test.actual, writer)?;
            writeln!(writer, "   Expected results:")?;
            write_grid(&test.expected, writer)?;
        }
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "Tests: {} total, {} passed, {} failed, {} errors",
        report.summary.total, report.summary.passed, report.summary.failed, report.summary.errors
    )?;
    if report.all_passed() {
        writeln!(writer, "ALL TESTS PASSED")?;
    }

    Ok(())
}

fn write_grid(rows: &[TextRow], writer: &mut dyn Write) -> std::io::Result<()> {
    if rows.is_empty() {
        return writeln!(writer, "      (no rows)");
    }
    for row in rows {
        writeln!(writer, "      {}", row.join(" | "))?;
    }
    Ok(())
}

fn write_json_report(report: &TestReport, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    writeln!(writer, "{}", json)
}
