use serde_json::Value;

use crate::path::DocumentPath;
use crate::Fields;

/// A stored document: its path, its fields, and the write that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
    /// Store-wide commit sequence of the last write to this document.
    pub version: u64,
}

impl Document {
    pub fn new(path: DocumentPath, fields: Fields, version: u64) -> Self {
        Self {
            path,
            fields,
            version,
        }
    }

    /// The document id (last path segment).
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// A top-level field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// A top-level field as a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// A top-level field as an integer.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_i64)
    }
}
