//! Intersection of changed lines with uncovered lines, per file and in
//! aggregate.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::diff::{ChangedLines, DiffSource};
use crate::error::Result;
use crate::index::UncoveredLineIndex;
use crate::model::{AggregateResult, FileDiffCoverage, FileOutcome, FileResult};
use crate::paths::PathResolver;

/// Per-file outcomes plus totals for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffCoverageReport {
    pub files: Vec<FileResult>,
    pub aggregate: AggregateResult,
}

impl DiffCoverageReport {
    /// Files whose changed lines could be measured.
    pub fn measured(&self) -> impl Iterator<Item = &FileDiffCoverage> {
        self.files.iter().filter_map(FileResult::measured)
    }

    /// Whether overall diff coverage reaches `min_percent`. A run with no
    /// measurable lines passes.
    #[must_use]
    pub fn meets_threshold(&self, min_percent: f64) -> bool {
        match self.aggregate.overall_percent() {
            Some(pct) => pct >= min_percent,
            None => true,
        }
    }
}

/// Intersect one file's changed lines with an uncovered set.
///
/// `changed` is ascending, so the result is too.
#[must_use]
pub fn intersect_file(changed: ChangedLines, uncovered: &BTreeSet<u32>) -> FileDiffCoverage {
    let changed_lines = changed.into_vec();
    let uncovered_lines = changed_lines
        .iter()
        .copied()
        .filter(|line| uncovered.contains(line))
        .collect();
    FileDiffCoverage {
        changed_lines,
        uncovered_lines,
    }
}

/// One analysis run: the coverage index plus the resolver that produced
/// its keys. Candidate paths go through the same resolver.
pub struct Analysis {
    index: UncoveredLineIndex,
    resolver: PathResolver,
}

impl Analysis {
    #[must_use]
    pub fn new(index: UncoveredLineIndex, resolver: PathResolver) -> Self {
        Self { index, resolver }
    }

    pub fn index(&self) -> &UncoveredLineIndex {
        &self.index
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Classify one candidate. The diff is only fetched when the report
    /// has data for the file.
    pub fn examine(&self, path: &str, source: &dyn DiffSource) -> Result<FileOutcome> {
        let resolved = self.resolver.resolve(path);
        let Some(uncovered) = self.index.get(&resolved) else {
            debug!(path, "no coverage data");
            return Ok(FileOutcome::NoCoverageData);
        };

        let changed = ChangedLines::from_diff(&source.file_diff(path)?);
        if changed.is_empty() {
            debug!(path, "no changed lines");
            return Ok(FileOutcome::NoChangedLines);
        }

        let file = intersect_file(changed, uncovered);
        debug!(
            path,
            changed = file.changed_line_count(),
            uncovered = file.uncovered_lines.len(),
            "measured"
        );
        Ok(FileOutcome::Measured(file))
    }

    /// Examine every candidate in order and total the measured files.
    pub fn run<S: AsRef<str>>(
        &self,
        candidates: &[S],
        source: &dyn DiffSource,
    ) -> Result<DiffCoverageReport> {
        let mut report = DiffCoverageReport::default();

        for candidate in candidates {
            let path = candidate.as_ref();
            let outcome = self.examine(path, source)?;
            if let FileOutcome::Measured(ref file) = outcome {
                report.aggregate.add(file);
            }
            report.files.push(FileResult {
                path: path.to_string(),
                outcome,
            });
        }

        info!(
            files = report.files.len(),
            total_changed = report.aggregate.total_changed,
            total_uncovered = report.aggregate.total_uncovered,
            "diff coverage computed"
        );
        Ok(report)
    }
}
