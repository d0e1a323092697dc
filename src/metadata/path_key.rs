//! Canonical join keys between Manifest.db paths and Photos.sqlite records
//!
//! Manifest paths are domain relative (`Media/DCIM/100APPLE/IMG_0001.HEIC`), while
//! Photos.sqlite stores `DCIM/100APPLE` and `IMG_0001.HEIC` in separate columns.
//! Both sides are reduced to `DCIM/100APPLE/IMG_0001.HEIC`.

use std::fmt;

/// Separator used by both Manifest.db paths and Photos.sqlite directories
pub const SEPARATOR: char = '/';

/// Canonical `directory/filename` key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    /// Build a key from a directory and a file name.
    ///
    /// Returns `None` if either part is empty.
    pub fn from_parts(directory: &str, filename: &str) -> Option<Self> {
        let directory = directory.trim_end_matches(SEPARATOR);
        if directory.is_empty() || filename.is_empty() {
            return None;
        }
        Some(PathKey(format!("{}{}{}", directory, SEPARATOR, filename)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split back into (directory, filename)
    pub fn split(&self) -> (&str, &str) {
        // Construction guarantees a separator.
        self.0
            .rsplit_once(SEPARATOR)
            .unwrap_or(("", self.0.as_str()))
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Domain-relative prefix under which library media lives (`Media/`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRoot(String);

impl MediaRoot {
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_matches(SEPARATOR);
        if trimmed.is_empty() {
            MediaRoot(String::new())
        } else {
            MediaRoot(format!("{}{}", trimmed, SEPARATOR))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether a manifest path lives under this root
    pub fn contains(&self, relative_path: &str) -> bool {
        relative_path.starts_with(&self.0)
    }

    /// Prepend the root to a canonical key, giving the manifest path
    pub fn manifest_path(&self, key: &PathKey) -> String {
        format!("{}{}", self.0, key.as_str())
    }

    /// Derive the canonical key of a manifest path.
    ///
    /// Returns `None` for paths outside the root and for paths without a directory
    /// component below it; those entries take no part in matching.
    pub fn derive_key(&self, relative_path: &str) -> Option<PathKey> {
        let remainder = relative_path.strip_prefix(self.0.as_str())?;
        let (directory, filename) = remainder.rsplit_once(SEPARATOR)?;
        PathKey::from_parts(directory, filename)
    }
}

impl Default for MediaRoot {
    fn default() -> Self {
        MediaRoot::new("Media/")
    }
}
