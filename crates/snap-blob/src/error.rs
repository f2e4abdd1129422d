use crate::path::ObjectPath;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// No object is stored at the path.
    #[error("object not found: {0}")]
    NotFound(ObjectPath),

    /// The path is not a valid object path.
    #[error("invalid object path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The backend could not be reached or rejected the request.
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned by a panicking writer.
    #[error("object store lock poisoned")]
    LockPoisoned,
}

/// Result alias for object store operations.
pub type BlobResult<T> = Result<T, BlobError>;
