use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tracing::info;

use snap_blob::{InMemoryObjectStore, ObjectStore};
use snap_docs::{DocumentStore, InMemoryDocumentStore};
use snap_feed::{
    AuthProvider, AvatarWorkflow, FeedConfig, FeedSubscription, FeedWatch, ImageSource,
    LikeCounter, NewPost, PostPublisher, Session, SubscriptionHandle,
};
use snap_types::{Comment, Post, PostId, User};

use crate::error::{SdkError, SdkResult};

/// Bytes stored as the default avatar by [`Snapline::in_memory`].
pub const DEFAULT_AVATAR_PLACEHOLDER: &[u8] = b"snapline-default-avatar";

/// High-level Snapline API.
///
/// Holds at most one signed-in session. Every operation that acts on
/// behalf of a user fails with [`SdkError::NotSignedIn`] without one.
pub struct Snapline {
    objects: Arc<dyn ObjectStore>,
    docs: Arc<dyn DocumentStore>,
    config: FeedConfig,
    avatars: AvatarWorkflow,
    likes: LikeCounter,
    publisher: PostPublisher,
    session: RwLock<Option<Arc<Session>>>,
}

impl Snapline {
    /// Build on existing stores.
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        docs: Arc<dyn DocumentStore>,
        config: FeedConfig,
    ) -> SdkResult<Self> {
        config.validate()?;
        Ok(Self {
            avatars: AvatarWorkflow::new(Arc::clone(&objects), Arc::clone(&docs), &config),
            likes: LikeCounter::new(Arc::clone(&docs), config.likes.mode),
            publisher: PostPublisher::new(
                Arc::clone(&objects),
                Arc::clone(&docs),
                config.storage.clone(),
            ),
            objects,
            docs,
            config,
            session: RwLock::new(None),
        })
    }

    /// Build on fresh in-memory stores, with the default avatar in place.
    pub fn in_memory(config: FeedConfig) -> SdkResult<Self> {
        let default_avatar = config.default_avatar_path()?;
        let objects = InMemoryObjectStore::default()
            .with_object(default_avatar, Bytes::from_static(DEFAULT_AVATAR_PLACEHOLDER));
        Self::new(
            Arc::new(objects),
            Arc::new(InMemoryDocumentStore::new()),
            config,
        )
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn docs(&self) -> &Arc<dyn DocumentStore> {
        &self.docs
    }

    // ---- Session ----

    /// Sign in as whoever `auth` reports, replacing any current session.
    pub async fn sign_in(&self, auth: &dyn AuthProvider) -> SdkResult<User> {
        let session = Session::sign_in(auth).await?;
        let user = session.user();
        let previous = self
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(Arc::new(session));
        if let Some(previous) = previous {
            info!(user = %previous.user_id(), "previous session replaced");
        }
        Ok(user)
    }

    /// End the session and return the final user state.
    ///
    /// Feed subscriptions handed out earlier belong to the caller and keep
    /// running until their handles are cancelled or dropped.
    pub fn sign_out(&self) -> Option<User> {
        let session = self
            .session
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take()?;
        Some(match Arc::try_unwrap(session) {
            Ok(session) => session.sign_out(),
            // An operation still holds the session; report its state.
            Err(shared) => shared.user(),
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|session| session.user())
    }

    fn session(&self) -> SdkResult<Arc<Session>> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(SdkError::NotSignedIn)
    }

    // ---- Avatar ----

    /// Set a new avatar, or the default one when `image` is `None`.
    pub async fn set_avatar(&self, image: Option<&dyn ImageSource>) -> SdkResult<String> {
        let session = self.session()?;
        Ok(self.avatars.set_avatar(&session, image).await?)
    }

    pub async fn remove_avatar(&self) -> SdkResult<String> {
        let session = self.session()?;
        Ok(self.avatars.remove_avatar(&session).await?)
    }

    // ---- Feed ----

    /// Push the signed-in user's feed to `on_update` until the handle is
    /// cancelled.
    pub async fn watch_profile_feed<F>(&self, on_update: F) -> SdkResult<SubscriptionHandle>
    where
        F: FnMut(Vec<Post>) + Send + 'static,
    {
        let user = self.session()?.user_id();
        Ok(FeedSubscription::subscribe(Arc::clone(&self.docs), &user, on_update).await?)
    }

    /// Pull-style form of [`watch_profile_feed`](Self::watch_profile_feed).
    pub async fn open_profile_feed(&self) -> SdkResult<FeedWatch> {
        let user = self.session()?.user_id();
        Ok(FeedWatch::open(self.docs.as_ref(), &user).await?)
    }

    // ---- Posts, likes, comments ----

    pub async fn create_post(&self, new: NewPost<'_>) -> SdkResult<Post> {
        let session = self.session()?;
        Ok(self.publisher.create_post(&session, new).await?)
    }

    /// Like a post. `Ok(None)` means the write failed and was logged.
    pub async fn like(&self, post: &Post) -> SdkResult<Option<u64>> {
        self.session()?;
        Ok(self.likes.like(post).await)
    }

    pub async fn add_comment(&self, post: &PostId, text: &str) -> SdkResult<Comment> {
        let session = self.session()?;
        Ok(self.publisher.add_comment(&session, post, text).await?)
    }

    pub async fn comments(&self, post: &PostId) -> SdkResult<Vec<Comment>> {
        Ok(self.publisher.comments(post).await?)
    }
}

impl std::fmt::Debug for Snapline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapline")
            .field("config", &self.config)
            .field("user", &self.current_user().map(|u| u.id))
            .finish_non_exhaustive()
    }
}
