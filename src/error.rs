use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffcovError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Coverage report not found: {}. Re-run the test suite with lcov output enabled.", .0.display())]
    ReportNotFound(PathBuf),

    #[error("Could not read coverage report {}: {source}", path.display())]
    ReportUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not a git repository. Run this tool inside a git work tree.")]
    NotARepository,

    #[error("Base ref '{0}' does not exist or is invalid. Try `git fetch` to update your local branches.")]
    BaseRefNotFound(String),

    #[error("Git operation failed: {0}")]
    Git(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DiffcovError>;
