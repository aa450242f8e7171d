/// Extract changed line numbers from unified-diff hunk headers.
///
/// Only the `+<start>[,<count>]` side of each `@@` header is used; content
/// lines are never inspected. Diffs are expected to be produced with zero
/// context (`git diff -U0`) so the new-side range is exactly the set of
/// added or modified lines.
///
/// Also provides a [`DiffSource`] trait that abstracts over different
/// ways to obtain per-file diffs (git, a pre-made patch).
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::git;

// ---------------------------------------------------------------------------
// Hunk parsing
// ---------------------------------------------------------------------------

/// Upper bound on the line numbers one diff may expand to. Headers that
/// would push past it are skipped, so a bogus count cannot exhaust memory.
pub const MAX_CHANGED_LINES: usize = 1 << 22;

fn hunk_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").expect("valid hunk regex")
    })
}

fn hunk_counts() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -\d+(?:,(\d+))? \+\d+(?:,(\d+))? @@").expect("valid hunk regex")
    })
}

/// Parse every hunk header in `diff_text` and return the new-side line
/// numbers in header order.
///
/// A missing count means one line; a zero count (pure deletion) adds
/// nothing. Headers that do not match, or whose numbers do not fit, are
/// skipped, as are headers that would exceed [`MAX_CHANGED_LINES`].
/// Duplicates from overlapping hunks are kept as-is.
#[must_use]
pub fn parse_hunk_lines(diff_text: &str) -> Vec<u32> {
    let mut lines = Vec::new();
    for caps in hunk_header().captures_iter(diff_text) {
        let Ok(start) = caps[1].parse::<u32>() else {
            continue;
        };
        let count = match caps.get(2) {
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(n) => n,
                Err(_) => continue,
            },
            None => 1,
        };
        if count == 0 {
            continue;
        }
        // Line numbers are 1-based; a nonzero count at start 0 is malformed.
        if start == 0 {
            continue;
        }
        let Some(end) = start.checked_add(count - 1) else {
            continue;
        };
        if lines.len().saturating_add(count as usize) > MAX_CHANGED_LINES {
            warn!(start, count, "skipping oversized hunk");
            continue;
        }
        lines.extend(start..=end);
    }
    lines
}

/// Lines introduced or modified in one file, ascending with no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedLines(Vec<u32>);

impl ChangedLines {
    /// Build from a single-file diff.
    #[must_use]
    pub fn from_diff(diff_text: &str) -> Self {
        Self::from_lines(parse_hunk_lines(diff_text))
    }

    #[must_use]
    pub fn from_lines(mut lines: Vec<u32>) -> Self {
        lines.sort_unstable();
        lines.dedup();
        Self(lines)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

/// Split a multi-file unified diff into per-file sections keyed by the
/// new-side path. Deleted files (`+++ /dev/null`) are dropped.
///
/// Hunk bodies are consumed using the counts from their `@@` header, so a
/// removed `-- x` line followed by an added `++ y` line is never taken for
/// a `---`/`+++` file header.
#[must_use]
pub fn split_by_file(diff_text: &str) -> BTreeMap<String, String> {
    let mut result: BTreeMap<String, String> = BTreeMap::new();
    let mut current_file: Option<String> = None;
    // Body lines still owed by the current hunk: (old side, new side).
    let mut pending = (0u32, 0u32);
    let mut lines = diff_text.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("diff --git ") {
            current_file = None;
            pending = (0, 0);
            continue;
        }

        if let Some(counts) = parse_hunk_counts(line) {
            pending = counts;
        } else if !consume_body_line(line, &mut pending) {
            pending = (0, 0);
            let is_file_header = line.starts_with("--- ")
                && lines.peek().is_some_and(|next| next.starts_with("+++ "));
            if is_file_header {
                let Some(new_header) = lines.next() else {
                    break;
                };
                current_file = start_section(&mut result, line, new_header);
                continue;
            }
        }

        if let Some(section) = current_file.as_ref().and_then(|f| result.get_mut(f)) {
            section.push_str(line);
            section.push('\n');
        }
    }

    result
}

/// Open (or reopen) the section named by a `+++` header. Returns `None` for
/// a deleted file.
fn start_section(
    result: &mut BTreeMap<String, String>,
    old_header: &str,
    new_header: &str,
) -> Option<String> {
    let rest = &new_header["+++ ".len()..];
    let rest = rest.split('\t').next().unwrap_or(rest);
    if rest == "/dev/null" {
        return None; // File was deleted
    }

    // Strip common VCS prefixes: "b/" (default git), "a/" (some tools).
    // Also handles --no-prefix diffs where no prefix is present.
    let path = rest
        .strip_prefix("b/")
        .or_else(|| rest.strip_prefix("a/"))
        .unwrap_or(rest)
        .to_string();
    let section = result.entry(path.clone()).or_default();
    section.push_str(old_header);
    section.push('\n');
    section.push_str(new_header);
    section.push('\n');
    Some(path)
}

/// Old and new line counts of a hunk header. A count that does not fit is
/// treated as zero.
fn parse_hunk_counts(line: &str) -> Option<(u32, u32)> {
    let caps = hunk_counts().captures(line)?;
    let count = |i: usize| {
        caps.get(i)
            .map_or(Some(1), |m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };
    Some((count(1), count(2)))
}

/// Account for one hunk body line. Returns false when `line` cannot belong
/// to the current hunk.
fn consume_body_line(line: &str, pending: &mut (u32, u32)) -> bool {
    let (old, new) = pending;
    match line.as_bytes().first() {
        Some(b'-') if *old > 0 => *old -= 1,
        Some(b'+') if *new > 0 => *new -= 1,
        Some(b' ') if *old > 0 && *new > 0 => {
            *old -= 1;
            *new -= 1;
        }
        // "\ No newline at end of file"
        Some(b'\\') => {}
        _ => return false,
    }
    true
}

// ---------------------------------------------------------------------------
// Diff sources
// ---------------------------------------------------------------------------

/// Where candidate files and their diffs come from.
pub trait DiffSource {
    /// Paths changed relative to the base, as the source reports them.
    fn changed_files(&self) -> Result<Vec<String>>;

    /// Zero-context unified diff for one path.
    fn file_diff(&self, path: &str) -> Result<String>;
}

/// Diff against a git base ref (e.g. `main`).
pub struct GitDiff {
    /// Working directory git is run from.
    pub repo: PathBuf,
    /// Ref the working tree is compared with.
    pub base_ref: String,
}

impl GitDiff {
    /// Check that `repo` is a work tree and `base_ref` resolves before use.
    pub fn open(repo: impl Into<PathBuf>, base_ref: impl Into<String>) -> Result<Self> {
        let repo = repo.into();
        let base_ref = base_ref.into();
        git::verify_repo(&repo)?;
        git::verify_base_ref(&repo, &base_ref)?;
        Ok(Self { repo, base_ref })
    }
}

impl DiffSource for GitDiff {
    fn changed_files(&self) -> Result<Vec<String>> {
        git::changed_files(&self.repo, &self.base_ref)
    }

    fn file_diff(&self, path: &str) -> Result<String> {
        git::file_diff(&self.repo, &self.base_ref, path)
    }
}

/// A pre-made unified diff, e.g. read from stdin or a `.patch` file.
pub struct PatchDiff {
    files: BTreeMap<String, String>,
}

impl PatchDiff {
    #[must_use]
    pub fn new(diff_text: &str) -> Self {
        let files = split_by_file(diff_text);
        debug!(files = files.len(), "split patch into per-file diffs");
        Self { files }
    }
}

impl DiffSource for PatchDiff {
    fn changed_files(&self) -> Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn file_diff(&self, path: &str) -> Result<String> {
        Ok(self.files.get(path).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Hunk parsing tests -------------------------------------------------

    #[test]
    fn test_parse_hunk_lines_with_counts() {
        assert_eq!(parse_hunk_lines("@@ -10,5 +20,3 @@"), vec![20, 21, 22]);
        assert_eq!(parse_hunk_lines("@@ -0,0 +1,2 @@"), vec![1, 2]);
    }

    #[test]
    fn test_parse_hunk_lines_missing_count_means_one() {
        assert_eq!(parse_hunk_lines("@@ -5 +7 @@"), vec![7]);
        assert_eq!(parse_hunk_lines("@@ -5,2 +7 @@ fn main() {"), vec![7]);
    }

    #[test]
    fn test_parse_hunk_lines_pure_deletion() {
        assert!(parse_hunk_lines("@@ -5,3 +5,0 @@").is_empty());
        assert!(parse_hunk_lines("@@ -1,3 +0,0 @@").is_empty());
    }

    #[test]
    fn test_parse_hunk_lines_empty_text() {
        assert!(parse_hunk_lines("").is_empty());
    }

    #[test]
    fn test_parse_hunk_lines_ignores_content_and_file_headers() {
        let diff = "\
diff --git a/src/app.js b/src/app.js
index 83db48f..bf269f4 100644
--- a/src/app.js
+++ b/src/app.js
@@ -3,0 +4,2 @@ function main() {
+  const y = 2;
+  console.log(y);
@@ -10 +12 @@ function other() {
-  return 1;
+  return 2;
";
        assert_eq!(parse_hunk_lines(diff), vec![4, 5, 12]);
    }

    #[test]
    fn test_parse_hunk_lines_skips_malformed_headers() {
        let diff = "@@ -a,b +c,d @@\n@@ +3,1 @@\n@@ -1,1 +2,1\n@@ -1 +4,2 @@\n";
        assert_eq!(parse_hunk_lines(diff), vec![4, 5]);
    }

    #[test]
    fn test_parse_hunk_lines_header_must_start_line() {
        // A content line that happens to contain a header is not a header.
        assert!(parse_hunk_lines("+  // @@ -1 +1,3 @@").is_empty());
    }

    #[test]
    fn test_parse_hunk_lines_tolerates_overlap_and_disorder() {
        let diff = "@@ -1 +10,2 @@\n@@ -1 +2,2 @@\n@@ -1 +11,1 @@\n";
        assert_eq!(parse_hunk_lines(diff), vec![10, 11, 2, 3, 11]);
    }

    #[test]
    fn test_parse_hunk_lines_overflow_is_skipped() {
        let diff = "@@ -1 +4294967295,2 @@\n@@ -1 +99999999999,1 @@\n@@ -1 +4294967295 @@\n";
        assert_eq!(parse_hunk_lines(diff), vec![u32::MAX]);
    }

    #[test]
    fn test_parse_hunk_lines_skips_huge_count() {
        let diff = "@@ -1 +1,4000000000 @@\n@@ -1 +7 @@\n";
        assert_eq!(parse_hunk_lines(diff), vec![7]);
    }

    #[test]
    fn test_parse_hunk_lines_total_is_bounded() {
        let diff = "@@ -1 +1,3000000 @@\n@@ -1 +4000000,3000000 @@\n@@ -1 +9 @@\n";
        let lines = parse_hunk_lines(diff);
        assert_eq!(lines.len(), 3_000_001);
        assert_eq!(lines.last(), Some(&9));
    }

    #[test]
    fn test_changed_lines_sorted_and_deduplicated() {
        let changed = ChangedLines::from_diff("@@ -1 +10,2 @@\n@@ -1 +2,2 @@\n@@ -1 +11,1 @@\n");
        assert_eq!(changed.as_slice(), &[2, 3, 10, 11]);
        assert_eq!(changed.len(), 4);
    }

    // -- Splitting tests ----------------------------------------------------

    #[test]
    fn test_split_by_file_multiple_files() {
        let diff = "\
diff --git a/a.js b/a.js
--- a/a.js
+++ b/a.js
@@ -1,0 +2 @@
+x
diff --git a/b.js b/b.js
--- a/b.js
+++ b/b.js
@@ -4,0 +5,3 @@
+y
+y
+y
";
        let files = split_by_file(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(parse_hunk_lines(&files["a.js"]), vec![2]);
        assert_eq!(parse_hunk_lines(&files["b.js"]), vec![5, 6, 7]);
    }

    #[test]
    fn test_split_by_file_drops_deleted_file() {
        let diff = "\
diff --git a/gone.js b/gone.js
deleted file mode 100644
--- a/gone.js
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        assert!(split_by_file(diff).is_empty());
    }

    #[test]
    fn test_split_by_file_no_prefix() {
        let diff = "--- src/lib.rs\n+++ src/lib.rs\n@@ -1 +1 @@\n-a\n+b\n";
        let files = split_by_file(diff);
        assert_eq!(parse_hunk_lines(&files["src/lib.rs"]), vec![1]);
    }

    #[test]
    fn test_split_by_file_removed_line_resembling_header() {
        // A removed line whose text starts with "-- " shows up as "--- ".
        let diff = "\
--- a/notes.sql
+++ b/notes.sql
@@ -2 +2 @@
--- old comment
+-- new comment
";
        let files = split_by_file(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(parse_hunk_lines(&files["notes.sql"]), vec![2]);
        assert!(files["notes.sql"].contains("+-- new comment"));
    }

    #[test]
    fn test_split_by_file_body_lines_resembling_both_headers() {
        // "-- old" removed and "++ new" added look like a file header pair.
        let diff = "\
--- a/query.sql
+++ b/query.sql
@@ -3 +3 @@
--- old
+++ new
--- a/other.sql
+++ b/other.sql
@@ -0,0 +1 @@
+x
";
        let files = split_by_file(diff);
        assert_eq!(files.len(), 2);
        assert!(!files.contains_key("new"));
        assert!(files["query.sql"].contains("+++ new"));
        assert_eq!(parse_hunk_lines(&files["query.sql"]), vec![3]);
        assert_eq!(parse_hunk_lines(&files["other.sql"]), vec![1]);
    }

    #[test]
    fn test_split_by_file_no_newline_marker() {
        let diff = "\
--- a/a.js
+++ b/a.js
@@ -1 +1 @@
-a
\\ No newline at end of file
+b
\\ No newline at end of file
--- a/b.js
+++ b/b.js
@@ -0,0 +1 @@
+c
";
        let files = split_by_file(diff);
        assert_eq!(files.len(), 2);
        assert_eq!(parse_hunk_lines(&files["a.js"]), vec![1]);
        assert_eq!(parse_hunk_lines(&files["b.js"]), vec![1]);
    }

    #[test]
    fn test_patch_diff_source() {
        let source = PatchDiff::new("--- a/x.ts\n+++ b/x.ts\n@@ -0,0 +1,2 @@\n+a\n+b\n");
        assert_eq!(source.changed_files().unwrap(), vec!["x.ts".to_string()]);
        assert_eq!(
            ChangedLines::from_diff(&source.file_diff("x.ts").unwrap()).as_slice(),
            &[1, 2]
        );
        assert_eq!(source.file_diff("missing.ts").unwrap(), "");
    }
}
