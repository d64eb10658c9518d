//! Result comparison
//!
//! Strict positional comparison of actual and expected text grids. A row
//! count mismatch is reported once and ends the comparison; a column count
//! mismatch skips that row's cells.

use super::types::TextRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One difference between the actual and expected grids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    RowCount {
        expected: usize,
        actual: usize,
    },
    ColumnCount {
        row: usize,
        expected: usize,
        actual: usize,
    },
    Cell {
        row: usize,
        column: usize,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::RowCount { expected, actual } => {
                write!(f, "Row count mismatch: expected {}, got {}", expected, actual)
            }
            Discrepancy::ColumnCount {
                row,
                expected,
                actual,
            } => write!(
                f,
                "Row {}: Column count mismatch: expected {}, got {}",
                row, expected, actual
            ),
            Discrepancy::Cell {
                row,
                column,
                expected,
                actual,
            } => write!(
                f,
                "Row {}, Column {}: expected '{}', got '{}'",
                row, column, expected, actual
            ),
        }
    }
}

/// Verdict of one comparison
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonOutcome {
    pub passed: bool,
    pub discrepancies: Vec<Discrepancy>,
}

impl ComparisonOutcome {
    fn from_discrepancies(discrepancies: Vec<Discrepancy>) -> Self {
        Self {
            passed: discrepancies.is_empty(),
            discrepancies,
        }
    }

    /// Discrepancies rendered as messages, in discovery order
    pub fn messages(&self) -> Vec<String> {
        self.discrepancies.iter().map(|d| d.to_string()).collect()
    }
}

/// Compare `actual` rows against `expected` rows cell by cell
pub fn compare_results(actual: &[TextRow], expected: &[TextRow]) -> ComparisonOutcome {
    if actual.len() != expected.len() {
        return ComparisonOutcome::from_discrepancies(vec![Discrepancy::RowCount {
            expected: expected.len(),
            actual: actual.len(),
        }]);
    }

    let mut discrepancies = Vec::new();
    for (row, (actual_row, expected_row)) in actual.iter().zip(expected).enumerate() {
        if actual_row.len() != expected_row.len() {
            discrepancies.push(Discrepancy::ColumnCount {
                row,
                expected: expected_row.len(),
                actual: actual_row.len(),
            });
            continue;
        }

        for (column, (a, e)) in actual_row.iter().zip(expected_row).enumerate() {
            if a != e {
                discrepancies.push(Discrepancy::Cell {
                    row,
                    column,
                    expected: e.clone(),
                    actual: a.clone(),
                });
            }
        }
    }

    ComparisonOutcome::from_discrepancies(discrepancies)
}
