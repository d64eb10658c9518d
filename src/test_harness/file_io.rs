//! File readers for fixtures and queries
//!
//! - CSV fixtures are returned as raw text rows, header included
//! - SQL files are returned trimmed and `;`-terminated

use super::error::{TestHarnessError, TestHarnessResult};
use super::types::TextRow;
use std::collections::HashMap;
use std::path::Path;

/// Read a CSV file into text rows.
///
/// The header is returned as the first row; no column interpretation happens
/// here. Rows may have differing lengths.
pub fn read_csv_file(path: impl AsRef<Path>) -> TestHarnessResult<Vec<TextRow>> {
    let path = path.as_ref();
    let unreadable = |message: String| TestHarnessError::UnreadableSource {
        path: path.display().to_string(),
        message,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| unreadable(e.to_string()))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| unreadable(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    log::debug!("Read {} CSV rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read a SQL file, trimming whitespace and terminating with `;`.
pub fn read_sql_file(path: impl AsRef<Path>) -> TestHarnessResult<String> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| TestHarnessError::UnreadableSource {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    Ok(normalize_sql(&content))
}

/// Read several SQL files, keyed by file name.
pub fn read_sql_files<P: AsRef<Path>>(paths: &[P]) -> TestHarnessResult<HashMap<String, String>> {
    let mut queries = HashMap::new();
    for path in paths {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        queries.insert(name, read_sql_file(path)?);
    }
    Ok(queries)
}

/// Trim and ensure a trailing statement terminator
pub fn normalize_sql(content: &str) -> String {
    let query = content.trim();
    if query.ends_with(';') {
        query.to_string()
    } else {
        format!("{};", query)
    }
}
