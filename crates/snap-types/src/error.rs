use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("invalid {kind}: {value:?}: {reason}")]
    InvalidId {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("coordinate out of range: latitude={latitude}, longitude={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("cannot decode {kind} {id}: {reason}")]
    Decode {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}
