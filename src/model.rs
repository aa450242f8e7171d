//! Result types produced by the diff-coverage analysis. Everything here is
//! owned by a single run and serializable for the JSON report.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Compute `covered / total * 100` rounded half-up to two decimals, or
/// `None` when there is nothing to measure.
///
/// Rounding is done in integer arithmetic so values such as 2/3 or 1/8
/// round the same way on every platform.
#[must_use]
pub fn percent(covered: u64, total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let covered = u128::from(covered.min(total));
    let total = u128::from(total);
    // hundredths of a percent, rounded half-up
    let scaled = (covered * 10_000 * 2 + total) / (total * 2);
    Some(scaled as f64 / 100.0)
}

/// A single line record from a coverage report section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCoverage {
    pub line_number: u32,
    pub hit_count: u64,
}

/// One `SF:` section of a coverage report, path as written in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCoverage {
    pub path: String,
    pub lines: Vec<LineCoverage>,
}

impl FileCoverage {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

/// Diff coverage for a file that has both coverage data and changed lines.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiffCoverage {
    /// Changed lines in the new version of the file, ascending.
    pub changed_lines: Vec<u32>,
    /// Subset of `changed_lines` with zero hits, ascending.
    pub uncovered_lines: Vec<u32>,
}

impl FileDiffCoverage {
    #[must_use]
    pub fn changed_line_count(&self) -> usize {
        self.changed_lines.len()
    }

    #[must_use]
    pub fn covered_count(&self) -> usize {
        self.changed_lines.len() - self.uncovered_lines.len()
    }

    /// Percentage of changed lines that are covered. Always `Some` for a
    /// measured file, since measured files have at least one changed line.
    #[must_use]
    pub fn percent(&self) -> Option<f64> {
        percent(self.covered_count() as u64, self.changed_line_count() as u64)
    }
}

// Counts and the percentage are derived, so the impl is written by hand.
impl Serialize for FileDiffCoverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FileDiffCoverage", 4)?;
        s.serialize_field("changed_line_count", &self.changed_line_count())?;
        s.serialize_field("changed_lines", &self.changed_lines)?;
        s.serialize_field("uncovered_lines", &self.uncovered_lines)?;
        s.serialize_field("coverage_percent", &self.percent())?;
        s.end()
    }
}

/// Terminal state for one candidate file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The report has no section for this file. Not a coverage failure.
    NoCoverageData,
    /// The diff introduces no lines (pure deletion or empty diff).
    NoChangedLines,
    Measured(FileDiffCoverage),
}

/// Outcome for one candidate, keyed by the path the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileResult {
    #[must_use]
    pub fn measured(&self) -> Option<&FileDiffCoverage> {
        match &self.outcome {
            FileOutcome::Measured(m) => Some(m),
            _ => None,
        }
    }
}

/// Totals across every measured file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub total_changed: u64,
    pub total_uncovered: u64,
}

impl AggregateResult {
    pub fn add(&mut self, file: &FileDiffCoverage) {
        self.total_changed += file.changed_line_count() as u64;
        self.total_uncovered += file.uncovered_lines.len() as u64;
    }

    #[must_use]
    pub fn total_covered(&self) -> u64 {
        self.total_changed - self.total_uncovered
    }

    /// Overall diff coverage, undefined when no lines were measured.
    #[must_use]
    pub fn overall_percent(&self) -> Option<f64> {
        percent(self.total_covered(), self.total_changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_zero_total_is_undefined() {
        assert_eq!(percent(0, 0), None);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        assert_eq!(percent(1, 2), Some(50.0));
        assert_eq!(percent(2, 3), Some(66.67));
        assert_eq!(percent(1, 3), Some(33.33));
        // 1/8 = 12.5%, 1/16 = 6.25%, 1/32 = 3.125% -> 3.13
        assert_eq!(percent(1, 32), Some(3.13));
        assert_eq!(percent(3, 4), Some(75.0));
        assert_eq!(percent(4, 4), Some(100.0));
    }

    #[test]
    fn test_file_diff_coverage_counts() {
        let f = FileDiffCoverage {
            changed_lines: vec![1, 2, 3],
            uncovered_lines: vec![2],
        };
        assert_eq!(f.changed_line_count(), 3);
        assert_eq!(f.covered_count(), 2);
        assert_eq!(f.percent(), Some(66.67));
    }

    #[test]
    fn test_aggregate_empty_has_no_percent() {
        let agg = AggregateResult::default();
        assert_eq!(agg.overall_percent(), None);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let result = FileResult {
            path: "src/a.js".to_string(),
            outcome: FileOutcome::NoCoverageData,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "no_coverage_data");
        assert_eq!(json["path"], "src/a.js");
    }

    #[test]
    fn test_measured_serializes_percent() {
        let result = FileResult {
            path: "src/a.js".to_string(),
            outcome: FileOutcome::Measured(FileDiffCoverage {
                changed_lines: vec![1, 2],
                uncovered_lines: vec![1],
            }),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "measured");
        assert_eq!(json["changed_line_count"], 2);
        assert_eq!(json["uncovered_lines"], serde_json::json!([1]));
        assert_eq!(json["coverage_percent"], 50.0);
        assert_eq!(json["path"], "src/a.js");
        assert_eq!(json.as_object().unwrap().len(), 6);
    }
}
