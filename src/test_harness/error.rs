//! Error types for the test harness
//!
//! Every stage of a test case (fixture loading, query execution, reading the
//! expected output) fails fast with one of these. Comparison mismatches are
//! not errors; they are reported as discrepancies.

use super::schema::FieldType;
use std::fmt;
use std::io;

/// Main error type for test harness operations
#[derive(Debug, Clone)]
pub enum TestHarnessError {
    /// Fixture has no data row beyond the header
    EmptyFixture { path: String, rows: usize },

    /// A fixture cell could not be coerced to its declared type
    TypeConversionError {
        value: String,
        field_type: FieldType,
        column: usize,
        /// 1-based data row number, when known
        row: Option<usize>,
    },

    /// Dataset creation found an existing dataset
    DatasetAlreadyExists { dataset: String },

    /// Scratch table already exists
    TableAlreadyExists { table: String },

    /// Bulk insert was rejected (table may be left empty or partially populated)
    InsertFailed { table: String, message: String },

    /// Query submission failed or the job ended in failure.
    /// `message` is the engine's own text, unmodified.
    QueryExecutionFailed { test_name: String, message: String },

    /// Query or fixture file could not be read or parsed
    UnreadableSource { path: String, message: String },

    /// Failed to parse the suite definition
    SpecParseError { message: String, file: String },

    /// Configuration error
    ConfigError { message: String },

    /// Engine transport or protocol failure outside the cases above
    EngineError {
        operation: String,
        message: String,
    },

    /// Job did not reach a terminal state in time
    Timeout { operation: String, timeout_ms: u64 },
}

impl fmt::Display for TestHarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestHarnessError::EmptyFixture { path, rows } => {
                write!(
                    f,
                    "Fixture '{}' must contain a header row and at least one data row (found {} rows)",
                    path, rows
                )
            }
            TestHarnessError::TypeConversionError {
                value,
                field_type,
                column,
                row,
            } => {
                if let Some(r) = row {
                    write!(
                        f,
                        "Cannot convert '{}' to {} (row {}, column {})",
                        value, field_type, r, column
                    )
                } else {
                    write!(
                        f,
                        "Cannot convert '{}' to {} (column {})",
                        value, field_type, column
                    )
                }
            }
            TestHarnessError::DatasetAlreadyExists { dataset } => {
                write!(f, "Dataset '{}' already exists", dataset)
            }
            TestHarnessError::TableAlreadyExists { table } => {
                write!(f, "Table '{}' already exists", table)
            }
            TestHarnessError::InsertFailed { table, message } => {
                write!(f, "Failed to insert rows into '{}': {}", table, message)
            }
            TestHarnessError::QueryExecutionFailed { test_name, message } => {
                write!(f, "Query for test '{}' failed: {}", test_name, message)
            }
            TestHarnessError::UnreadableSource { path, message } => {
                write!(f, "Cannot read '{}': {}", path, message)
            }
            TestHarnessError::SpecParseError { message, file } => {
                write!(f, "Suite parse error in {}: {}", file, message)
            }
            TestHarnessError::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            TestHarnessError::EngineError { operation, message } => {
                write!(f, "Engine error during '{}': {}", operation, message)
            }
            TestHarnessError::Timeout {
                operation,
                timeout_ms,
            } => {
                write!(f, "Timeout after {}ms during '{}'", timeout_ms, operation)
            }
        }
    }
}

impl std::error::Error for TestHarnessError {}

impl From<io::Error> for TestHarnessError {
    fn from(err: io::Error) -> Self {
        TestHarnessError::UnreadableSource {
            message: err.to_string(),
            path: String::new(),
        }
    }
}

impl From<serde_yaml::Error> for TestHarnessError {
    fn from(err: serde_yaml::Error) -> Self {
        TestHarnessError::SpecParseError {
            message: err.to_string(),
            file: String::new(),
        }
    }
}

impl From<csv::Error> for TestHarnessError {
    fn from(err: csv::Error) -> Self {
        TestHarnessError::UnreadableSource {
            message: err.to_string(),
            path: String::new(),
        }
    }
}

impl From<reqwest::Error> for TestHarnessError {
    fn from(err: reqwest::Error) -> Self {
        TestHarnessError::EngineError {
            operation: err
                .url()
                .map(|u| u.path().to_string())
                .unwrap_or_else(|| "request".to_string()),
            message: err.to_string(),
        }
    }
}

/// Result type alias for test harness operations
pub type TestHarnessResult<T> = Result<T, TestHarnessError>;
