use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{BlobError, BlobResult};
use crate::path::{ObjectMetadata, ObjectPath, ObjectRef};
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Durable URLs have the form
/// `{base_url}/{path}`. [`set_unavailable`](Self::set_unavailable) makes
/// every operation fail, which is how tests simulate a network outage.
pub struct InMemoryObjectStore {
    base_url: String,
    objects: RwLock<HashMap<ObjectPath, Bytes>>,
    unavailable: AtomicBool,
}

impl InMemoryObjectStore {
    /// Create a new empty store serving URLs under `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            objects: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Seed an object, e.g. the default avatar image.
    pub fn with_object(self, path: ObjectPath, data: impl Into<Bytes>) -> Self {
        if let Ok(mut map) = self.objects.write() {
            map.insert(path, data.into());
        }
        self
    }

    /// Toggle simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read back the bytes stored at `path`.
    pub fn get(&self, path: &ObjectPath) -> Option<Bytes> {
        self.objects.read().ok()?.get(path).cloned()
    }

    /// Sorted list of all stored paths.
    pub fn paths(&self) -> Vec<ObjectPath> {
        let mut paths: Vec<ObjectPath> = match self.objects.read() {
            Ok(map) => map.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();
        paths
    }

    fn check_available(&self) -> BlobResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BlobError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, path: &ObjectPath, data: Bytes) -> BlobResult<ObjectRef> {
        self.check_available()?;
        let size = data.len();
        let mut map = self.objects.write().map_err(|_| BlobError::LockPoisoned)?;
        map.insert(path.clone(), data);
        debug!(%path, size, "object stored");
        Ok(ObjectRef::new(path.clone()))
    }

    async fn resolve_url(&self, object: &ObjectRef) -> BlobResult<String> {
        self.check_available()?;
        let map = self.objects.read().map_err(|_| BlobError::LockPoisoned)?;
        if !map.contains_key(&object.path) {
            return Err(BlobError::NotFound(object.path.clone()));
        }
        Ok(format!("{}/{}", self.base_url, object.path))
    }

    async fn metadata(&self, object: &ObjectRef) -> BlobResult<Option<ObjectMetadata>> {
        self.check_available()?;
        let map = self.objects.read().map_err(|_| BlobError::LockPoisoned)?;
        Ok(map.get(&object.path).map(|data| ObjectMetadata::for_bytes(data)))
    }

    async fn delete(&self, object: &ObjectRef) -> BlobResult<bool> {
        self.check_available()?;
        let mut map = self.objects.write().map_err(|_| BlobError::LockPoisoned)?;
        Ok(map.remove(&object.path).is_some())
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("base_url", &self.base_url)
            .field("object_count", &self.len())
            .finish()
    }
}
