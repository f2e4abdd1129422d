//! Error types for document operations.

use thiserror::Error;

use crate::path::DocumentPath;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum DocError {
    /// The document does not exist.
    #[error("document not found: {0}")]
    NotFound(DocumentPath),

    /// A collection or document path is malformed.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The query cannot be evaluated.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An increment targeted a field that does not hold an integer.
    #[error("field {field} of {path} is not an integer")]
    NotNumeric { path: DocumentPath, field: String },

    /// A batch exceeded the store's write limit.
    #[error("batch of {len} writes exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    /// The backend could not be reached or rejected the request.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// Internal lock was poisoned by a panicking writer.
    #[error("document store lock poisoned")]
    LockPoisoned,
}

/// Convenience type alias for document operations.
pub type DocResult<T> = std::result::Result<T, DocError>;
