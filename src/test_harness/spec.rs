//! Test suite definition
//!
//! Defines the YAML suite format:
//!
//! ```yaml
//! dataset: test_dataset        # optional
//! base_path: fixtures          # optional, defaults to the suite file's directory
//! setup:                       # optional statements run before any test
//!   - CREATE TEMP FUNCTION ...
//! tests:
//!   - name: totals_by_customer
//!     query_file: totals.sql
//!     input_file: orders.csv
//!     expected_output: totals_expected.csv
//!     table_name: orders_totals
//!     schema_overrides:
//!       amount: FLOAT
//!       order_date: DATE
//! ```

use super::error::{TestHarnessError, TestHarnessResult};
use super::utils::{get_base_dir, resolve_path, DEFAULT_DATASET};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A suite of test cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    /// Test case definitions, run in order
    #[serde(default)]
    pub tests: Vec<TestCase>,

    /// Directory relative paths are resolved against
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    /// Dataset holding the scratch tables
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Statements submitted once before the first test
    #[serde(default)]
    pub setup: Vec<String>,

    /// Path the suite was loaded from (not serialized)
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_dataset() -> String {
    DEFAULT_DATASET.to_string()
}

/// A single test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Test name
    pub name: String,

    /// SQL file; `${TABLE}` in it is replaced with the scratch table
    pub query_file: PathBuf,

    /// CSV fixture loaded into the scratch table
    pub input_file: PathBuf,

    /// CSV of expected result rows
    pub expected_output: PathBuf,

    /// Scratch table name, unique per test case
    pub table_name: String,

    /// Column name → type token (INTEGER, FLOAT, BOOLEAN, TIMESTAMP, DATE)
    #[serde(default)]
    pub schema_overrides: HashMap<String, String>,
}

impl TestSuite {
    /// Load a suite from a YAML file and resolve its paths
    pub fn from_file(path: impl AsRef<Path>) -> TestHarnessResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TestHarnessError::UnreadableSource {
            message: e.to_string(),
            path: path.display().to_string(),
        })?;

        let mut suite = Self::from_yaml(&content, path.display().to_string())?;
        let suite_dir = get_base_dir(path);
        suite.base_path = Some(match suite.base_path.take() {
            Some(base) if base.is_absolute() => base,
            Some(base) => suite_dir.join(base),
            None => suite_dir,
        });
        suite.source_path = Some(path.to_path_buf());
        suite.resolve_paths();
        Ok(suite)
    }

    /// Parse a suite from a YAML string. Paths are left as written.
    pub fn from_yaml(yaml: &str, file_name: String) -> TestHarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| TestHarnessError::SpecParseError {
            message: e.to_string(),
            file: file_name,
        })
    }

    /// Resolve every relative test path against `base_path`
    pub fn resolve_paths(&mut self) {
        let Some(base) = self.base_path.clone() else {
            return;
        };
        for test in &mut self.tests {
            test.query_file = resolve_path(&test.query_file, &base);
            test.input_file = resolve_path(&test.input_file, &base);
            test.expected_output = resolve_path(&test.expected_output, &base);
        }
    }

    fn file_name(&self) -> String {
        self.source_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<suite>".to_string())
    }

    /// Validate the suite
    pub fn validate(&self) -> TestHarnessResult<()> {
        if self.tests.is_empty() {
            return Err(TestHarnessError::SpecParseError {
                message: "No tests defined in the configuration".to_string(),
                file: self.file_name(),
            });
        }
        if self.dataset.trim().is_empty() {
            return Err(TestHarnessError::SpecParseError {
                message: "Dataset cannot be empty".to_string(),
                file: self.file_name(),
            });
        }

        let mut seen = HashSet::new();
        for test in &self.tests {
            test.validate().map_err(|message| TestHarnessError::SpecParseError {
                message: format!("Invalid test '{}': {}", test.name, message),
                file: self.file_name(),
            })?;
            if !seen.insert(&test.name) {
                return Err(TestHarnessError::SpecParseError {
                    message: format!("Duplicate test name: {}", test.name),
                    file: self.file_name(),
                });
            }
        }
        Ok(())
    }

    /// Get a test by name
    pub fn get_test(&self, name: &str) -> Option<&TestCase> {
        self.tests.iter().find(|t| t.name == name)
    }
}

impl TestCase {
    /// Check required fields and file extensions
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Test name cannot be empty".to_string());
        }
        check_file(&self.query_file, "Query file", "sql")?;
        check_file(&self.expected_output, "Expected output file", "csv")?;
        check_file(&self.input_file, "Input file", "csv")?;
        if self.table_name.trim().is_empty() {
            return Err("Table name cannot be empty".to_string());
        }
        Ok(())
    }
}

fn check_file(path: &Path, what: &str, extension: &str) -> Result<(), String> {
    if path.as_os_str().is_empty() {
        return Err(format!("{} path cannot be empty", what));
    }
    let matches = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false);
    if !matches {
        return Err(format!("{} must have .{} extension", what, extension));
    }
    Ok(())
}
