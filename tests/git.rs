//! End-to-end runs against a throwaway git repository.

use std::path::Path;
use std::process::Command;

use diffcov::cli::cmd_check;
use diffcov::config::Config;
use diffcov::diff::{DiffSource, GitDiff};
use diffcov::error::DiffcovError;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(dir)
        .args([
            "-c",
            "user.name=diffcov",
            "-c",
            "user.email=diffcov@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .status()
        .unwrap();
    assert!(status.success(), "git {args:?} failed");
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// Repo with one committed file, then lines 2-3 rewritten in the work tree.
fn setup_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q"]);
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/app.js"), "a\nb\nc\nd\n").unwrap();
    std::fs::write(dir.path().join("README.md"), "readme\n").unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "-q", "-m", "init"]);

    std::fs::write(dir.path().join("src/app.js"), "a\nB\nC\nd\n").unwrap();
    std::fs::write(dir.path().join("README.md"), "changed\n").unwrap();
    dir
}

#[test]
fn git_source_lists_and_diffs_changed_files() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();

    let source = GitDiff::open(dir.path(), "HEAD").unwrap();
    let mut files = source.changed_files().unwrap();
    files.sort();
    assert_eq!(files, vec!["README.md", "src/app.js"]);

    let diff = source.file_diff("src/app.js").unwrap();
    assert_eq!(diffcov::diff::parse_hunk_lines(&diff), vec![2, 3]);
}

#[test]
fn check_against_git_base() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();
    let report = dir.path().join("lcov.info");
    std::fs::write(&report, "SF:src/app.js\nDA:1,1\nDA:2,1\nDA:3,0\nDA:4,1\nend_of_record\n")
        .unwrap();

    let mut config = Config::new(dir.path());
    config.base_ref = "HEAD".to_string();
    config.report = report;
    config.fail_under = Some(60.0);

    let source = GitDiff::open(dir.path(), "HEAD").unwrap();
    let out = cmd_check(&config, &source).unwrap();

    assert_eq!(out.report.files.len(), 1);
    assert_eq!(out.report.aggregate.total_changed, 2);
    assert_eq!(out.report.aggregate.total_uncovered, 1);
    assert!(out.text.contains("src/app.js - 1/2 (50.00%)  uncovered changed lines: 3"));
    assert!(!out.passed);
}

#[test]
fn non_ascii_paths_are_listed_unquoted() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();
    std::fs::write(dir.path().join("src/café.js"), "x\n").unwrap();
    git(dir.path(), &["add", "src/café.js"]);

    let source = GitDiff::open(dir.path(), "HEAD").unwrap();
    let files = source.changed_files().unwrap();
    assert!(files.iter().any(|f| f == "src/café.js"), "{files:?}");

    let diff = source.file_diff("src/café.js").unwrap();
    assert_eq!(diffcov::diff::parse_hunk_lines(&diff), vec![1]);
}

#[test]
fn unknown_base_ref_is_reported() {
    if !git_available() {
        return;
    }
    let dir = setup_repo();

    let err = GitDiff::open(dir.path(), "no-such-branch").err().unwrap();
    assert!(matches!(err, DiffcovError::BaseRefNotFound(ref r) if r == "no-such-branch"));
    assert!(err.to_string().contains("git fetch"));
}
