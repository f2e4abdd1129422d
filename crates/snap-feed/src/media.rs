//! Image uploads.
//!
//! Every upload gets a fresh UUID v7 key, so two uploads in the same
//! millisecond never collide. When no image is supplied the configured
//! default object is resolved instead; nothing is uploaded in that case.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use snap_blob::{ObjectPath, ObjectStore};

use crate::config::StorageConfig;
use crate::error::{FeedError, FeedResult};

/// Handle to local image data picked by the user.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Read the whole image into memory.
    async fn read(&self) -> std::io::Result<Bytes>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Image bytes already in memory.
#[derive(Clone, Debug)]
pub struct MemoryImage {
    name: String,
    data: Bytes,
}

impl MemoryImage {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl ImageSource for MemoryImage {
    async fn read(&self) -> std::io::Result<Bytes> {
        Ok(self.data.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }
}

/// Image stored in a local file.
#[derive(Clone, Debug)]
pub struct FileImage {
    path: PathBuf,
}

impl FileImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageSource for FileImage {
    async fn read(&self) -> std::io::Result<Bytes> {
        Ok(Bytes::from(tokio::fs::read(&self.path).await?))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// A fresh, collision-free object key.
pub fn object_key() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Uploads images and resolves their durable URLs.
#[derive(Clone)]
pub struct MediaUploader {
    store: Arc<dyn ObjectStore>,
    layout: StorageConfig,
}

impl MediaUploader {
    pub fn new(store: Arc<dyn ObjectStore>, layout: StorageConfig) -> Self {
        Self { store, layout }
    }

    /// Upload an avatar, or resolve the default avatar when `source` is `None`.
    pub async fn upload(&self, source: Option<&dyn ImageSource>) -> FeedResult<String> {
        match source {
            Some(source) => self.upload_to(&self.layout.avatar_prefix, source).await,
            None => self.default_url().await,
        }
    }

    /// Durable URL of the default avatar. Performs no upload.
    pub async fn default_url(&self) -> FeedResult<String> {
        let path = ObjectPath::parse(self.layout.default_avatar.as_str())?;
        let url = self.store.resolve_url(&self.store.reference(&path)).await?;
        debug!(%path, "resolved default avatar");
        Ok(url)
    }

    /// Upload a post photo.
    pub async fn upload_post_photo(&self, source: &dyn ImageSource) -> FeedResult<String> {
        self.upload_to(&self.layout.post_photo_prefix, source).await
    }

    async fn upload_to(&self, prefix: &str, source: &dyn ImageSource) -> FeedResult<String> {
        let data = source.read().await?;
        if data.is_empty() {
            return Err(FeedError::EmptyImage);
        }
        let size = data.len();
        let path = ObjectPath::join(prefix, &object_key())?;
        let object = self.store.put(&path, data).await?;
        let url = self.store.resolve_url(&object).await?;
        info!(source = %source.describe(), %path, size, "image uploaded");
        Ok(url)
    }
}

impl std::fmt::Debug for MediaUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaUploader")
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap_blob::{BlobError, InMemoryObjectStore};

    fn store() -> Arc<InMemoryObjectStore> {
        Arc::new(
            InMemoryObjectStore::new("https://store")
                .with_object(ObjectPath::parse("userAvatars/default.jpg").unwrap(), &b"jpg"[..]),
        )
    }

    fn uploader(store: &Arc<InMemoryObjectStore>) -> MediaUploader {
        MediaUploader::new(store.clone(), StorageConfig::default())
    }

    #[tokio::test]
    async fn upload_stores_under_avatar_prefix() {
        let store = store();
        let url = uploader(&store)
            .upload(Some(&MemoryImage::new("img1", &b"png-bytes"[..])))
            .await
            .unwrap();
        assert!(url.starts_with("https://store/userAvatars/"));
        assert!(!url.ends_with("default.jpg"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn absent_image_resolves_default_without_upload() {
        let store = store();
        let url = uploader(&store).upload(None).await.unwrap();
        assert_eq!(url, "https://store/userAvatars/default.jpg");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_default_object_is_an_error() {
        let store = Arc::new(InMemoryObjectStore::new("https://store"));
        let err = uploader(&store).upload(None).await.unwrap_err();
        assert!(matches!(err, FeedError::Blob(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn rapid_uploads_get_distinct_keys() {
        let store = store();
        let up = uploader(&store);
        let img = MemoryImage::new("img", &b"x"[..]);
        let mut urls = Vec::new();
        for _ in 0..50 {
            urls.push(up.upload(Some(&img)).await.unwrap());
        }
        urls.sort();
        urls.dedup();
        assert_eq!(urls.len(), 50);
    }

    #[tokio::test]
    async fn empty_image_rejected() {
        let store = store();
        let err = uploader(&store)
            .upload(Some(&MemoryImage::new("empty", Bytes::new())))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::EmptyImage));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn store_errors_propagate_unmodified() {
        let store = store();
        store.set_unavailable(true);
        let err = uploader(&store)
            .upload(Some(&MemoryImage::new("img", &b"x"[..])))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Blob(BlobError::Unavailable(_))));
    }

    #[tokio::test]
    async fn file_image_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avatar.png");
        std::fs::write(&path, b"file-bytes").unwrap();
        let store = store();
        let url = uploader(&store).upload(Some(&FileImage::new(&path))).await.unwrap();
        let key = ObjectPath::parse(url.trim_start_matches("https://store/")).unwrap();
        assert_eq!(store.get(&key).unwrap(), Bytes::from_static(b"file-bytes"));
    }

    #[tokio::test]
    async fn unreadable_file_is_image_error() {
        let store = store();
        let err = uploader(&store)
            .upload(Some(&FileImage::new("/nonexistent/avatar.png")))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Image(_)));
    }

    #[tokio::test]
    async fn post_photos_use_their_own_prefix() {
        let store = store();
        let url = uploader(&store)
            .upload_post_photo(&MemoryImage::new("photo", &b"jpg"[..]))
            .await
            .unwrap();
        assert!(url.starts_with("https://store/postImages/"));
    }
}
