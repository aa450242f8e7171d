//! Per-file sets of zero-hit lines, built once per run from an LCOV report.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::error::{DiffcovError, Result};
use crate::model::FileCoverage;
use crate::parsers::lcov::{self, ParseStats};
use crate::paths::PathResolver;

/// What to do when a report has more than one section for the same file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DuplicatePolicy {
    /// The later section replaces the earlier one.
    #[default]
    LastWins,
    /// Uncovered lines from every section are combined.
    Union,
}

/// Absolute file path -> lines reported with zero hits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UncoveredLineIndex {
    files: HashMap<PathBuf, BTreeSet<u32>>,
}

impl UncoveredLineIndex {
    /// Build the index from report text.
    #[must_use]
    pub fn from_report(text: &str, resolver: &PathResolver, policy: DuplicatePolicy) -> Self {
        let (sections, stats) = lcov::parse(text.as_bytes());
        log_stats(&stats);
        Self::from_sections(sections, resolver, policy)
    }

    /// Read and index the report at `path`.
    ///
    /// A missing or unreadable report is fatal: nothing can be measured
    /// without it.
    pub fn load(path: &Path, resolver: &PathResolver, policy: DuplicatePolicy) -> Result<Self> {
        let file = File::open(path).map_err(|e| report_error(path, e))?;
        let mut reader = BufReader::new(file);

        let mut index = Self::default();
        let stats = lcov::parse_streaming(&mut reader, &mut |section| {
            index.insert(section, resolver, policy);
        })
        .map_err(|e| match e {
            DiffcovError::Io(source) => report_error(path, source),
            other => other,
        })?;

        log_stats(&stats);
        debug!(report = %path.display(), files = index.len(), "indexed coverage report");
        Ok(index)
    }

    pub fn from_sections(
        sections: impl IntoIterator<Item = FileCoverage>,
        resolver: &PathResolver,
        policy: DuplicatePolicy,
    ) -> Self {
        let mut index = Self::default();
        for section in sections {
            index.insert(section, resolver, policy);
        }
        index
    }

    fn insert(&mut self, section: FileCoverage, resolver: &PathResolver, policy: DuplicatePolicy) {
        let key = resolver.resolve(&section.path);
        let uncovered: BTreeSet<u32> = section
            .lines
            .iter()
            .filter(|l| l.hit_count == 0)
            .map(|l| l.line_number)
            .collect();

        match self.files.get_mut(&key) {
            Some(existing) => {
                warn!(path = %key.display(), ?policy, "coverage report has a duplicate section");
                match policy {
                    DuplicatePolicy::LastWins => *existing = uncovered,
                    DuplicatePolicy::Union => existing.extend(uncovered),
                }
            }
            None => {
                self.files.insert(key, uncovered);
            }
        }
    }

    /// Zero-hit lines for an already resolved path, or `None` when the
    /// report has no section for it.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&BTreeSet<u32>> {
        self.files.get(path)
    }

    /// Resolve `path` and look it up.
    #[must_use]
    pub fn uncovered_lines(&self, resolver: &PathResolver, path: &str) -> Option<&BTreeSet<u32>> {
        self.get(&resolver.resolve(path))
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn report_error(path: &Path, source: std::io::Error) -> DiffcovError {
    if source.kind() == ErrorKind::NotFound {
        DiffcovError::ReportNotFound(path.to_path_buf())
    } else {
        DiffcovError::ReportUnreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn log_stats(stats: &ParseStats) {
    if stats.malformed_records > 0 {
        warn!(count = stats.malformed_records, "skipped malformed DA records");
    }
    if stats.orphan_records > 0 {
        debug!(count = stats.orphan_records, "skipped DA records outside any SF section");
    }
}
