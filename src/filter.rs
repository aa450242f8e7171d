//! Selection of candidate files from the list of changed paths.
//!
//! Only source files are worth measuring: test files, tool configuration
//! and JSON data are dropped. In tests-only mode the selection is inverted
//! and only test files are kept.

use regex::Regex;

use crate::error::{DiffcovError, Result};

/// Extensions measured when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx"];

const CONFIG_FILE_STEMS: &str = "jest|babel|webpack|tsconfig|eslint|prettier|rollup|vite|package";

/// Decides which changed paths become candidate files.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    tests_only: bool,
    test_file: Regex,
    config_file: Regex,
}

impl FileFilter {
    /// Build a filter for `extensions` (without leading dots).
    pub fn new<S: AsRef<str>>(extensions: &[S], tests_only: bool) -> Result<Self> {
        let extensions: Vec<String> = extensions
            .iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(DiffcovError::InvalidConfig(
                "at least one source file extension is required".to_string(),
            ));
        }

        let alternation = extensions
            .iter()
            .map(|e| regex::escape(e))
            .collect::<Vec<_>>()
            .join("|");
        let test_file = Regex::new(&format!(r"(?i)\.(test|spec)\.({alternation})$"))
            .map_err(|e| DiffcovError::InvalidConfig(format!("bad extension list: {e}")))?;
        let config_file = Regex::new(&format!(
            r"(?i)(^|/)({CONFIG_FILE_STEMS})\.(js|ts|json)$"
        ))
        .map_err(|e| DiffcovError::InvalidConfig(format!("bad config pattern: {e}")))?;

        Ok(Self {
            extensions,
            tests_only,
            test_file,
            config_file,
        })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether `path` should be measured.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim();
        if path.is_empty() {
            return false;
        }
        let normalized = path.replace('\\', "/");

        if self.test_file.is_match(&normalized) {
            return self.tests_only;
        }
        if self.tests_only {
            return false;
        }

        let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
        if self.config_file.is_match(&normalized) || file_name.contains(".config.") {
            return false;
        }

        let lower = file_name.to_lowercase();
        if lower.ends_with(".json") {
            return false;
        }
        match lower.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self.extensions.iter().any(|e| e == ext),
            _ => false,
        }
    }

    /// Keep matching paths, preserving order.
    #[must_use]
    pub fn select<S: AsRef<str>>(&self, paths: &[S]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| self.matches(p))
            .map(str::to_string)
            .collect()
    }
}
