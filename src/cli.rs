//! Command handler functions for the diffcov CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::info;

use crate::config::Config;
use crate::diff::{ChangedLines, DiffSource};
use crate::index::{DuplicatePolicy, UncoveredLineIndex};
use crate::intersect::{Analysis, DiffCoverageReport};
use crate::paths::PathResolver;
use crate::report::{self, JsonFormatter, MarkdownFormatter, ReportFormatter, TextFormatter};

/// Output style for the `check` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Style {
    Text,
    Markdown,
    Json,
}

impl Style {
    fn formatter(self) -> &'static dyn ReportFormatter {
        match self {
            Style::Text => &TextFormatter,
            Style::Markdown => &MarkdownFormatter,
            Style::Json => &JsonFormatter,
        }
    }
}

/// Rendered result of a `check` run.
#[derive(Debug)]
pub struct CheckOutput {
    pub text: String,
    pub report: DiffCoverageReport,
    /// False only when `fail_under` is set and not met.
    pub passed: bool,
}

/// Measure diff coverage of the files `source` reports as changed.
pub fn cmd_check(config: &Config, source: &dyn DiffSource) -> Result<CheckOutput> {
    config.validate()?;

    let resolver = PathResolver::new(&config.root);
    let index = UncoveredLineIndex::load(config.report_path(), &resolver, config.duplicates)?;

    let changed = source
        .changed_files()
        .context("Failed to list changed files")?;
    let candidates = config.file_filter()?.select(&changed);
    info!(
        changed = changed.len(),
        candidates = candidates.len(),
        base = %config.base_ref,
        "selected candidate files"
    );

    let report = Analysis::new(index, resolver).run(&candidates, source)?;
    let text = report.format(config.style.formatter());
    let passed = config
        .fail_under
        .map_or(true, |min| report.meets_threshold(min));

    Ok(CheckOutput {
        text,
        report,
        passed,
    })
}

/// List the uncovered lines of one file, straight from the report.
pub fn cmd_uncovered(
    report_path: &Path,
    resolver: &PathResolver,
    duplicates: DuplicatePolicy,
    source_file: &str,
) -> Result<String> {
    let index = UncoveredLineIndex::load(report_path, resolver, duplicates)?;

    let Some(lines) = index.uncovered_lines(resolver, source_file) else {
        return Ok(format!("No coverage data for '{source_file}'\n"));
    };
    if lines.is_empty() {
        return Ok(format!(
            "All instrumented lines are covered in '{source_file}'\n"
        ));
    }

    let numbers: Vec<u32> = lines.iter().copied().collect();
    let mut out = String::new();
    writeln!(out, "Uncovered lines in '{source_file}':").unwrap();
    writeln!(out, "  {}", report::format_line_ranges(&numbers)).unwrap();
    writeln!(out, "  ({} lines)", numbers.len()).unwrap();
    Ok(out)
}

/// Show the lines a single-file diff introduces.
#[must_use]
pub fn cmd_changed(diff_text: &str) -> String {
    let changed = ChangedLines::from_diff(diff_text);
    if changed.is_empty() {
        return "No changed lines.\n".to_string();
    }
    format!(
        "Changed lines: {} ({} lines)\n",
        report::format_line_ranges(changed.as_slice()),
        changed.len()
    )
}
