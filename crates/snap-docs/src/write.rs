use crate::error::{DocError, DocResult};
use crate::path::DocumentPath;
use crate::Fields;

/// Maximum number of writes a single batch may carry.
pub const MAX_BATCH_WRITES: usize = 500;

/// A single document mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Create the document or replace all of its fields.
    Set { path: DocumentPath, fields: Fields },
    /// Merge top-level fields into an existing document.
    Update { path: DocumentPath, fields: Fields },
    /// Atomically add `by` to an integer field of an existing document.
    /// A missing field counts as zero.
    Increment {
        path: DocumentPath,
        field: String,
        by: i64,
    },
    /// Remove the document if present.
    Delete { path: DocumentPath },
}

impl WriteOp {
    /// The document this write targets.
    pub fn path(&self) -> &DocumentPath {
        match self {
            Self::Set { path, .. }
            | Self::Update { path, .. }
            | Self::Increment { path, .. }
            | Self::Delete { path } => path,
        }
    }
}

/// An ordered group of writes committed all-or-nothing.
///
/// Writes apply in insertion order, so a later write in the same batch
/// observes an earlier one (e.g. set-then-increment on one document).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn set(&mut self, path: DocumentPath, fields: Fields) -> &mut Self {
        self.push(WriteOp::Set { path, fields })
    }

    pub fn update(&mut self, path: DocumentPath, fields: Fields) -> &mut Self {
        self.push(WriteOp::Update { path, fields })
    }

    pub fn increment(&mut self, path: DocumentPath, field: impl Into<String>, by: i64) -> &mut Self {
        self.push(WriteOp::Increment {
            path,
            field: field.into(),
            by,
        })
    }

    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.push(WriteOp::Delete { path })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Fail if the batch exceeds [`MAX_BATCH_WRITES`].
    pub fn check_size(&self) -> DocResult<()> {
        if self.ops.len() > MAX_BATCH_WRITES {
            return Err(DocError::BatchTooLarge {
                len: self.ops.len(),
                max: MAX_BATCH_WRITES,
            });
        }
        Ok(())
    }
}

impl From<Vec<WriteOp>> for WriteBatch {
    fn from(ops: Vec<WriteOp>) -> Self {
        Self { ops }
    }
}
