//! Unit tests for result comparison
//!
//! Tests cover:
//! - Reflexivity over arbitrary grids
//! - Row count mismatch short-circuit
//! - Column count and cell mismatches with their messages

use super::common::grid;
use bqtest::test_harness::{compare_results, Discrepancy};

#[test]
fn test_compare_is_reflexive() {
    let grids = vec![
        grid(&[]),
        grid(&[&[]]),
        grid(&[&["1"]]),
        grid(&[&["a", "b", "c"], &["", "NULL", "x y"]]),
        grid(&[&["1"], &["1", "2"], &["1", "2", "3"]]),
    ];

    for g in &grids {
        let outcome = compare_results(g, g);
        assert!(outcome.passed, "grid {:?} should equal itself", g);
        assert!(outcome.discrepancies.is_empty());
    }
}

#[test]
fn test_single_row_vs_two_rows() {
    let outcome = compare_results(&grid(&[&["a"]]), &grid(&[&["a"], &["b"]]));

    assert!(!outcome.passed);
    assert_eq!(outcome.discrepancies.len(), 1);
    let message = outcome.discrepancies[0].to_string();
    assert!(message.contains('1'));
    assert!(message.contains('2'));
}

#[test]
fn test_cell_difference_reported_once() {
    let outcome = compare_results(&grid(&[&["1", "2"]]), &grid(&[&["1", "3"]]));

    assert_eq!(outcome.discrepancies.len(), 1);
    match &outcome.discrepancies[0] {
        Discrepancy::Cell {
            row,
            column,
            expected,
            actual,
        } => {
            assert_eq!((*row, *column), (0, 1));
            assert_eq!(expected, "3");
            assert_eq!(actual, "2");
        }
        other => panic!("unexpected discrepancy: {:?}", other),
    }
}

#[test]
fn test_comparison_is_textual() {
    // "1.0" and "1" are different texts even though numerically equal
    let outcome = compare_results(&grid(&[&["1.0"]]), &grid(&[&["1"]]));
    assert!(!outcome.passed);

    let outcome = compare_results(&grid(&[&["Foo"]]), &grid(&[&["foo"]]));
    assert!(!outcome.passed);
}

#[test]
fn test_mixed_row_shapes() {
    let actual = grid(&[&["a", "b"], &["c"], &["d", "e"]]);
    let expected = grid(&[&["a", "b"], &["c", "x"], &["d", "f"]]);

    let messages = compare_results(&actual, &expected).messages();
    assert_eq!(
        messages,
        vec![
            "Row 1: Column count mismatch: expected 2, got 1".to_string(),
            "Row 2, Column 1: expected 'f', got 'e'".to_string(),
        ]
    );
}
