//! Thin wrapper around the `git` command line.
//!
//! Every git invocation goes through [`run_git`] so failures carry the
//! subcommand and git's own stderr.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{DiffcovError, Result};

/// Captured output of a successful git command.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: &Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// Entries of NUL-terminated stdout (`-z` output). Paths are left
    /// unquoted and untrimmed.
    pub fn nul_entries(&self) -> Vec<&str> {
        self.stdout.split('\0').filter(|e| !e.is_empty()).collect()
    }
}

/// Run `git <args>` in `cwd`, failing on a non-zero exit status.
pub fn run_git<P: AsRef<Path>>(cwd: P, args: &[&str]) -> Result<GitOutput> {
    let cwd = cwd.as_ref();
    let subcommand = args.first().copied().unwrap_or("");
    debug!(cwd = %cwd.display(), ?args, "running git");

    let output = Command::new("git")
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|e| DiffcovError::Git(format!("failed to execute git {subcommand}: {e}")))?;

    let git_output = GitOutput::from_output(&output);
    if output.status.success() {
        return Ok(git_output);
    }

    let exit_code = output.status.code().unwrap_or(-1);
    let message = if git_output.stderr.is_empty() {
        git_output.stdout.trim().to_string()
    } else {
        git_output.stderr
    };
    Err(DiffcovError::Git(format!(
        "git {subcommand} failed (exit code {exit_code}): {message}"
    )))
}

/// Fail with [`DiffcovError::NotARepository`] unless `cwd` is inside a work tree.
pub fn verify_repo<P: AsRef<Path>>(cwd: P) -> Result<()> {
    run_git(cwd, &["rev-parse", "--is-inside-work-tree"])
        .map(|_| ())
        .map_err(|_| DiffcovError::NotARepository)
}

/// Fail with [`DiffcovError::BaseRefNotFound`] unless `base_ref` resolves.
pub fn verify_base_ref<P: AsRef<Path>>(cwd: P, base_ref: &str) -> Result<()> {
    run_git(cwd, &["rev-parse", "--verify", "--quiet", base_ref])
        .map(|_| ())
        .map_err(|_| DiffcovError::BaseRefNotFound(base_ref.to_string()))
}

/// Top-level directory of the work tree containing `cwd`. Paths printed by
/// `git diff --name-only` are relative to it.
pub fn repo_root<P: AsRef<Path>>(cwd: P) -> Result<PathBuf> {
    let output = run_git(cwd, &["rev-parse", "--show-toplevel"])?;
    Ok(PathBuf::from(output.stdout.trim()))
}

/// Paths changed between `base_ref` and the working tree.
///
/// `-z` keeps git from C-quoting paths with unusual characters.
pub fn changed_files<P: AsRef<Path>>(cwd: P, base_ref: &str) -> Result<Vec<String>> {
    let output = run_git(cwd, &["diff", "--name-only", "-z", base_ref])?;
    Ok(output.nul_entries().into_iter().map(str::to_string).collect())
}

/// Zero-context diff of one path against `base_ref`.
pub fn file_diff<P: AsRef<Path>>(cwd: P, base_ref: &str, path: &str) -> Result<String> {
    let output = run_git(cwd, &["diff", "-U0", base_ref, "--", path])?;
    Ok(output.stdout)
}
