#![allow(dead_code)]

use std::path::PathBuf;

use diffcov::index::{DuplicatePolicy, UncoveredLineIndex};
use diffcov::paths::PathResolver;
use tempfile::TempDir;

/// Write `lcov` into a fresh temporary directory, returning the dir handle
/// and the report path. The caller must hold onto `TempDir` to keep the
/// temp directory alive.
pub fn write_report(lcov: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lcov.info");
    std::fs::write(&path, lcov).unwrap();
    (dir, path)
}

/// Index `lcov` with paths resolved against `/repo`.
pub fn index(lcov: &str) -> (UncoveredLineIndex, PathResolver) {
    let resolver = PathResolver::new("/repo");
    let index = UncoveredLineIndex::from_report(lcov, &resolver, DuplicatePolicy::LastWins);
    (index, resolver)
}
