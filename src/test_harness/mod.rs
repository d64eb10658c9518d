//! BigQuery SQL Test Harness
//!
//! Runs SQL queries against CSV fixtures loaded into scratch tables and
//! compares the results with expected CSV output.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Test Harness Flow                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  1. Parse suite YAML & resolve paths                            │
//! │  2. Connect to the engine (BigQuery or emulator)                │
//! │  3. Run setup statements                                        │
//! │  4. For each test case:                                         │
//! │     a. Infer schema from the input CSV header + overrides       │
//! │     b. Ensure dataset, create scratch table                     │
//! │     c. Coerce every row, insert as one batch                    │
//! │     d. Substitute ${TABLE}, run the query job                   │
//! │     e. Compare result rows with the expected CSV                │
//! │  5. Generate report, close the engine                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Run every test in a suite
//! bqtest run -c tests.yaml
//!
//! # Run one test, printing actual and expected rows
//! bqtest run -c tests.yaml --test totals_by_customer -v
//!
//! # List tests
//! bqtest list -c tests.yaml
//! ```

pub mod coercion;
pub mod comparator;
pub mod config;
pub mod error;
pub mod executor;
pub mod file_io;
#[cfg(feature = "test-support")]
pub mod infra;
pub mod loader;
pub mod report;
pub mod runner;
pub mod schema;
pub mod spec;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use comparator::{compare_results, ComparisonOutcome, Discrepancy};
pub use config::EngineConfig;
pub use error::{TestHarnessError, TestHarnessResult};
pub use executor::QueryExecutor;
pub use loader::{FixtureLoader, LoadSummary};
pub use report::{OutputFormat, ReportGenerator, TestReport, TestStatus};
pub use runner::{TestCaseResult, TestRunner};
pub use schema::{infer_schema, FieldType, InferredSchema, SchemaField};
pub use spec::{TestCase, TestSuite};
pub use types::{FieldValue, TextRow, TypedRow};
