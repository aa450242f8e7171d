//! Path canonicalization shared by the coverage index and the candidate
//! files, so both sides produce identical keys.
//!
//! Resolution is purely lexical: a coverage report may name files that have
//! since been deleted or that live on another machine, so the filesystem is
//! never consulted.

use std::path::{Component, Path, PathBuf};

/// Resolves report and candidate paths against a fixed root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Anchor relative paths at `root`. A relative `root` is taken from the
    /// process working directory, so keys are always absolute.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(&absolute(root.as_ref())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` to an absolute, normalized form.
    ///
    /// Backslashes are treated as separators so reports written on Windows
    /// still match.
    #[must_use]
    pub fn resolve(&self, path: &str) -> PathBuf {
        let unified = path.trim().replace('\\', "/");
        let candidate = Path::new(&unified);
        if candidate.is_absolute() {
            normalize(candidate)
        } else {
            normalize(&self.root.join(candidate))
        }
    }
}

/// Join a relative `path` to the working directory. If the working
/// directory is unavailable the path is returned unchanged.
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Drop `.` components and fold `..` into its parent. `..` at the root
/// stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
