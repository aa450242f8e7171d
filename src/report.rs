//! Output formatting for diff coverage results.

use std::fmt::Write;

use serde::Serialize;

use crate::intersect::DiffCoverageReport;
use crate::model::{AggregateResult, FileOutcome, FileResult};

/// Trait for formatting diff coverage reports.
pub trait ReportFormatter {
    /// Format the report to a string.
    fn format(&self, report: &DiffCoverageReport) -> String;
}

impl DiffCoverageReport {
    /// Format using a specific formatter.
    #[must_use]
    pub fn format(&self, formatter: &dyn ReportFormatter) -> String {
        formatter.format(self)
    }
}

/// Plain text formatter: one status line per file, then a summary.
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &DiffCoverageReport) -> String {
        let mut out = String::new();

        if report.files.is_empty() {
            out.push_str("No changed source files found.\n");
            return out;
        }

        for file in &report.files {
            let path = &file.path;
            match &file.outcome {
                FileOutcome::NoCoverageData => {
                    writeln!(out, "{path} - no coverage data").unwrap();
                }
                FileOutcome::NoChangedLines => {
                    writeln!(out, "{path} - no changed lines").unwrap();
                }
                FileOutcome::Measured(f) if f.uncovered_lines.is_empty() => {
                    let total = f.changed_line_count();
                    writeln!(out, "{path} - all {total} changed lines covered").unwrap();
                }
                FileOutcome::Measured(f) => {
                    let covered = f.covered_count();
                    let total = f.changed_line_count();
                    let pct = f.percent().unwrap_or(0.0);
                    let missed = format_line_ranges(&f.uncovered_lines);
                    writeln!(
                        out,
                        "{path} - {covered}/{total} ({pct:.2}%)  uncovered changed lines: {missed}"
                    )
                    .unwrap();
                }
            }
        }

        out.push('\n');
        let agg = &report.aggregate;
        match agg.overall_percent() {
            Some(pct) => {
                let covered = agg.total_covered();
                let total = agg.total_changed;
                writeln!(
                    out,
                    "Diff coverage: {pct:.2}% ({covered}/{total} changed lines covered)"
                )
                .unwrap();
            }
            None => out.push_str("Diff coverage: no changed lines to measure\n"),
        }

        out
    }
}

/// Markdown formatter, suitable for a pull request comment.
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &DiffCoverageReport) -> String {
        let mut md = String::new();
        let agg = &report.aggregate;

        match agg.overall_percent() {
            Some(pct) => {
                writeln!(md, "### Diff Coverage: {pct:.2}%\n").unwrap();
                let covered = agg.total_covered();
                let total = agg.total_changed;
                writeln!(md, "**{covered}** of **{total}** changed lines covered").unwrap();
            }
            None => md.push_str("### Diff Coverage: n/a\n\nNo changed lines to measure.\n"),
        }

        let mut files_with_misses: Vec<_> = report
            .files
            .iter()
            .filter_map(|r| r.measured().map(|f| (r.path.as_str(), f)))
            .filter(|(_, f)| !f.uncovered_lines.is_empty())
            .collect();
        files_with_misses.sort_by(|(_, a), (_, b)| {
            a.percent()
                .unwrap_or(0.0)
                .total_cmp(&b.percent().unwrap_or(0.0))
        });

        if !files_with_misses.is_empty() {
            md.push_str("\n| File | Missed | Diff | Uncovered lines |\n");
            md.push_str("|:-----|-------:|-----:|:----------------|\n");
            for (path, f) in &files_with_misses {
                let missed = f.uncovered_lines.len();
                let pct = f.percent().unwrap_or(0.0);
                let ranges = format_line_ranges(&f.uncovered_lines);
                writeln!(md, "| `{path}` | {missed} | {pct:.0}% | {ranges} |").unwrap();
            }
        } else if agg.total_changed > 0 {
            md.push_str("\nAll changed lines are covered!\n");
        }

        let unmeasured: Vec<&str> = report
            .files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::NoCoverageData))
            .map(|f| f.path.as_str())
            .collect();
        if !unmeasured.is_empty() {
            md.push_str("\n<details>\n<summary>Files without coverage data</summary>\n\n");
            for path in unmeasured {
                writeln!(md, "- `{path}`").unwrap();
            }
            md.push_str("\n</details>\n");
        }

        md
    }
}

/// Pretty-printed JSON.
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonReport<'a> {
    files: &'a [FileResult],
    #[serde(flatten)]
    aggregate: &'a AggregateResult,
    overall_percent: Option<f64>,
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &DiffCoverageReport) -> String {
        let view = JsonReport {
            files: &report.files,
            aggregate: &report.aggregate,
            overall_percent: report.aggregate.overall_percent(),
        };
        // Serializing plain structs of numbers and strings cannot fail.
        let mut out = serde_json::to_string_pretty(&view).unwrap_or_default();
        out.push('\n');
        out
    }
}

/// Coalesce sorted line numbers into `(start, end)` runs of consecutive
/// lines.
#[must_use]
pub fn coalesce_ranges(lines: &[u32]) -> Vec<(u32, u32)> {
    let Some((&first, rest)) = lines.split_first() else {
        return Vec::new();
    };

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    let mut start = first;
    let mut end = first;

    for &line in rest {
        if end.checked_add(1) == Some(line) {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

/// Format line numbers into compact range notation, e.g. "1, 3-5, 8".
///
/// The input slice must be sorted in ascending order.
#[must_use]
pub fn format_line_ranges(lines: &[u32]) -> String {
    coalesce_ranges(lines)
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
