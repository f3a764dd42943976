//! Test utilities for keel unit tests.
//!
//! Everything here writes real files into temporary directories; the
//! build pipeline reads and writes the filesystem directly, so tests do
//! the same.

pub mod fixtures;

use std::path::Path;

/// Relative paths of every file below `root`, sorted, with `/` separators.
pub fn list_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(crate::util::fs::to_slash)
        })
        .collect();
    files.sort();
    files
}
