//! Run configuration, assembled by the binary from flags and environment
//! variables and handed to the command handlers.

use std::path::{Path, PathBuf};

use crate::cli::Style;
use crate::error::{DiffcovError, Result};
use crate::filter::{FileFilter, DEFAULT_EXTENSIONS};
use crate::index::DuplicatePolicy;

pub const DEFAULT_BASE_REF: &str = "main";
pub const DEFAULT_REPORT: &str = "coverage/lcov.info";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory that relative paths in the report and the diff are
    /// resolved against.
    pub root: PathBuf,
    /// Git ref the working tree is compared with.
    pub base_ref: String,
    /// LCOV report. Relative paths are taken from the working directory.
    pub report: PathBuf,
    /// Source file extensions to measure.
    pub extensions: Vec<String>,
    /// Measure changed test files instead of source files.
    pub tests_only: bool,
    /// Minimum overall diff coverage, in percent.
    pub fail_under: Option<f64>,
    pub duplicates: DuplicatePolicy,
    pub style: Style,
}

impl Config {
    /// Defaults rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_ref: DEFAULT_BASE_REF.to_string(),
            report: PathBuf::from(DEFAULT_REPORT),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            tests_only: false,
            fail_under: None,
            duplicates: DuplicatePolicy::default(),
            style: Style::Text,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(min) = self.fail_under {
            if !(0.0..=100.0).contains(&min) {
                return Err(DiffcovError::InvalidConfig(format!(
                    "fail-under must be between 0 and 100, got {min}"
                )));
            }
        }
        if self.base_ref.trim().is_empty() {
            return Err(DiffcovError::InvalidConfig("base ref must not be empty".to_string()));
        }
        self.file_filter().map(|_| ())
    }

    pub fn file_filter(&self) -> Result<FileFilter> {
        FileFilter::new(&self.extensions, self.tests_only)
    }

    pub fn report_path(&self) -> &Path {
        &self.report
    }
}
