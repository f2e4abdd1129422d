use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobResult;
use crate::path::{ObjectMetadata, ObjectPath, ObjectRef};

/// Path-keyed binary object store.
///
/// All implementations must satisfy these invariants:
/// - `put` either stores the full buffer or fails; there are no partial objects.
/// - `resolve_url` returns a URL that stays valid for as long as the object
///   exists, and fails with `NotFound` when nothing is stored at the path.
/// - Errors are returned to the caller unmodified. Implementations never retry.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Build a reference to `path` without touching the backend.
    fn reference(&self, path: &ObjectPath) -> ObjectRef {
        ObjectRef::new(path.clone())
    }

    /// Store `data` at `path`, replacing any existing object.
    async fn put(&self, path: &ObjectPath, data: Bytes) -> BlobResult<ObjectRef>;

    /// Resolve the durable retrieval URL of an existing object.
    async fn resolve_url(&self, object: &ObjectRef) -> BlobResult<String>;

    /// Size and content hash of an object, or `None` if it does not exist.
    async fn metadata(&self, object: &ObjectRef) -> BlobResult<Option<ObjectMetadata>>;

    /// Delete an object. Returns `true` if it existed.
    async fn delete(&self, object: &ObjectRef) -> BlobResult<bool>;
}
