//! Path normalization — the anchor of cross-checkout cache portability.
//!
//! Every cache key is a [`SourcePath`]: a logical path string relative to
//! the site root, normalized to forward slashes. Paths outside the site
//! root keep their absolute, forward-slash-normalized form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A normalized, POSIX-slash logical path used as a cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePath(String);

impl SourcePath {
    pub fn new(s: impl Into<String>) -> Self {
        Self(normalize_slashes(&s.into()))
    }

    /// Build a `SourcePath` from a filesystem path, relative to the site
    /// root when inside it, absolute otherwise.
    pub fn from_fs_path(path: &Path, site_root: &Path) -> Self {
        let abs = normalize_fs(path);
        let abs_root = normalize_fs(site_root);
        match abs.strip_prefix(&abs_root) {
            Ok(rel) => Self::new(rel.to_string_lossy().to_string()),
            Err(_) => Self::new(abs.to_string_lossy().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn normalize_slashes(s: &str) -> String {
    s.replace('\\', "/")
}

/// Resolve a filesystem path to absolute form without requiring it to
/// exist: `canonicalize()` first, falling back to cwd-join for paths that
/// haven't been written yet (e.g. a planned output path).
pub fn normalize_fs(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        let p = SourcePath::new("content\\posts\\a.md");
        assert_eq!(p.as_str(), "content/posts/a.md");
    }

    #[test]
    fn from_fs_path_is_relative_inside_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        let file = root.join("content").join("a.md");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, "x").unwrap();
        let sp = SourcePath::from_fs_path(&file, root);
        assert_eq!(sp.as_str(), "content/a.md");
    }

    #[test]
    fn equality_and_hash_by_string_value() {
        let a = SourcePath::new("content/a.md");
        let b = SourcePath::new("content\\a.md");
        assert_eq!(a, b);
    }
}
