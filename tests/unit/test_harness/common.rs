//! Shared helpers for test harness tests

use bqtest::test_harness::TextRow;
use std::path::{Path, PathBuf};

/// Build a text grid from string literals
pub fn grid(data: &[&[&str]]) -> Vec<TextRow> {
    data.iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect()
}

/// Write `content` to `dir/name`, returning the path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}
