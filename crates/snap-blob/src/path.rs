//! Object paths and references.
//!
//! Valid object paths:
//! - Must be non-empty
//! - Must not start or end with `/`
//! - Must not contain empty segments (`//`)
//! - Must not contain `.` or `..` segments
//! - Must not contain control characters

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BlobError, BlobResult};

/// A validated slash-separated path inside the object store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Parse and validate a path.
    ///
    /// # Examples
    ///
    /// ```
    /// use snap_blob::ObjectPath;
    ///
    /// assert!(ObjectPath::parse("userAvatars/default.jpg").is_ok());
    /// assert!(ObjectPath::parse("/userAvatars").is_err());
    /// assert!(ObjectPath::parse("a//b").is_err());
    /// ```
    pub fn parse(path: impl Into<String>) -> BlobResult<Self> {
        let path = path.into();
        let invalid = |reason| BlobError::InvalidPath {
            path: path.clone(),
            reason,
        };

        if path.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if path.starts_with('/') || path.ends_with('/') {
            return Err(invalid("must not start or end with '/'"));
        }
        if path.chars().any(char::is_control) {
            return Err(invalid("must not contain control characters"));
        }
        for segment in path.split('/') {
            if segment.is_empty() {
                return Err(invalid("must not contain empty segments"));
            }
            if segment == "." || segment == ".." {
                return Err(invalid("must not contain '.' or '..' segments"));
            }
        }
        Ok(Self(path))
    }

    /// Join a prefix directory and a single key segment.
    pub fn join(prefix: &str, key: &str) -> BlobResult<Self> {
        if key.contains('/') {
            return Err(BlobError::InvalidPath {
                path: format!("{prefix}/{key}"),
                reason: "key must be a single segment",
            });
        }
        Self::parse(format!("{prefix}/{key}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Debug for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPath({})", self.0)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to an object location, returned by uploads and lookups.
///
/// Holding a reference does not imply the object exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub path: ObjectPath,
}

impl ObjectRef {
    pub fn new(path: ObjectPath) -> Self {
        Self { path }
    }
}

/// Stored object facts reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub size: u64,
    /// Hex-encoded BLAKE3 hash of the object bytes.
    pub content_hash: String,
}

impl ObjectMetadata {
    pub fn for_bytes(data: &[u8]) -> Self {
        Self {
            size: data.len() as u64,
            content_hash: hex::encode(blake3::hash(data).as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_paths() {
        for p in ["userAvatars/default.jpg", "a", "postImages/0192abc", "a/b/c.d"] {
            assert!(ObjectPath::parse(p).is_ok(), "{p} should be valid");
        }
    }

    #[test]
    fn invalid_paths() {
        for p in ["", "/a", "a/", "a//b", "a/../b", "./a", "a/\u{7}b"] {
            assert!(ObjectPath::parse(p).is_err(), "{p:?} should be invalid");
        }
    }

    #[test]
    fn join_builds_two_segments() {
        let p = ObjectPath::join("userAvatars", "k1").unwrap();
        assert_eq!(p.as_str(), "userAvatars/k1");
        assert_eq!(p.file_name(), "k1");
    }

    #[test]
    fn join_rejects_nested_key() {
        assert!(ObjectPath::join("userAvatars", "x/y").is_err());
    }

    #[test]
    fn metadata_hashes_content() {
        let a = ObjectMetadata::for_bytes(b"abc");
        let b = ObjectMetadata::for_bytes(b"abc");
        let c = ObjectMetadata::for_bytes(b"abd");
        assert_eq!(a, b);
        assert_ne!(a.content_hash, c.content_hash);
        assert_eq!(a.size, 3);
        assert_eq!(a.content_hash.len(), 64);
    }
}
