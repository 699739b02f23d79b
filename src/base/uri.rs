//! Document identifiers and edit versions.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The URI of an open document, used as the key of every per-document cache.
///
/// Cheap to clone (an `Arc<str>`). Comparison is plain string equality, so the
/// host must hand out URIs in one canonical spelling.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DocUri(Arc<str>);

impl DocUri {
    pub fn new(uri: impl Into<Arc<str>>) -> Self {
        Self(uri.into())
    }

    /// Build a `file://` URI from a filesystem path.
    pub fn from_file_path(path: &Path) -> Self {
        Self::new(format!("file://{}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URI scheme (`file`, `untitled`, ...), empty when there is none.
    pub fn scheme(&self) -> &str {
        self.0.split_once(':').map(|(scheme, _)| scheme).unwrap_or("")
    }

    pub fn is_file(&self) -> bool {
        self.scheme() == "file"
    }

    /// The filesystem path for `file://` URIs.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix("file://").map(PathBuf::from)
    }

    /// The last path segment, used for dialect detection.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Debug for DocUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocUri({})", self.0)
    }
}

impl fmt::Display for DocUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for DocUri {
    fn from(uri: String) -> Self {
        Self::new(uri)
    }
}

/// The host editor's per-document edit counter.
///
/// Monotonically increasing for a given URI; a cache entry is valid iff its
/// stored version equals the document's current version.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct DocVersion(pub i32);

impl DocVersion {
    #[inline]
    pub const fn new(version: i32) -> Self {
        Self(version)
    }

    #[inline]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for DocVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<i32> for DocVersion {
    #[inline]
    fn from(version: i32) -> Self {
        Self(version)
    }
}
