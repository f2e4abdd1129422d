//! Like counters.
//!
//! [`LikeCounter::increment`] is a server-side atomic increment and never
//! loses a concurrent like. [`LikeCounter::set_likes`] overwrites the stored
//! count with a value the caller computed from what it last saw, which is
//! how the mobile client originally worked: two taps computed from the same
//! stale count land as one.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use snap_docs::{DocumentStore, Fields};
use snap_types::{fields, Post, PostId};

use crate::config::LikeMode;
use crate::error::{FeedError, FeedResult};
use crate::paths;

#[derive(Clone)]
pub struct LikeCounter {
    docs: Arc<dyn DocumentStore>,
    mode: LikeMode,
}

impl LikeCounter {
    pub fn new(docs: Arc<dyn DocumentStore>, mode: LikeMode) -> Self {
        Self { docs, mode }
    }

    pub fn mode(&self) -> LikeMode {
        self.mode
    }

    /// Overwrite the like count. Failures are logged, not returned; the
    /// result says whether the write landed.
    pub async fn set_likes(&self, post: &PostId, likes: u64) -> bool {
        match self.try_set_likes(post, likes).await {
            Ok(()) => {
                debug!(%post, likes, "like count written");
                true
            }
            Err(e) => {
                warn!(%post, likes, error = %e, "like count not written");
                false
            }
        }
    }

    async fn try_set_likes(&self, post: &PostId, likes: u64) -> FeedResult<()> {
        let mut update = Fields::new();
        update.insert(fields::post::LIKES.into(), Value::from(likes));
        self.docs.update(&paths::post(post)?, update).await?;
        Ok(())
    }

    /// Add one like atomically and return the new count.
    pub async fn increment(&self, post: &PostId) -> FeedResult<u64> {
        let path = paths::post(post)?;
        let likes = self
            .docs
            .increment(&path, fields::post::LIKES, 1)
            .await
            .map_err(|e| match e {
                snap_docs::DocError::NotFound(_) => FeedError::PostNotFound(post.clone()),
                other => FeedError::Doc(other),
            })?;
        debug!(%post, likes, "like counted");
        u64::try_from(likes).map_err(|_| {
            warn!(%post, likes, "stored like count is negative");
            FeedError::InvalidInput(format!("post {post} has a negative like count ({likes})"))
        })
    }

    /// Register one like on `post` as seen by the caller.
    ///
    /// Returns the count now stored, or `None` when the write failed (the
    /// failure is logged).
    pub async fn like(&self, post: &Post) -> Option<u64> {
        match self.mode {
            LikeMode::Atomic => match self.increment(&post.id).await {
                Ok(likes) => Some(likes),
                Err(e) => {
                    warn!(post = %post.id, error = %e, "like not counted");
                    None
                }
            },
            LikeMode::Overwrite => {
                let likes = post.likes.saturating_add(1);
                self.set_likes(&post.id, likes).await.then_some(likes)
            }
        }
    }
}

impl std::fmt::Debug for LikeCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LikeCounter")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snap_docs::InMemoryDocumentStore;
    use snap_types::{Timestamp, UserId};

    async fn seeded(likes: u64) -> (Arc<InMemoryDocumentStore>, Post) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let post = Post {
            id: PostId::new("p1").unwrap(),
            user_id: UserId::new("u").unwrap(),
            photo: "https://store/postImages/p1".into(),
            title: "sunset".into(),
            created_date: Timestamp::from_millis(1),
            likes,
            location: None,
            place: "beach".into(),
            comments_quantity: 0,
        };
        store
            .set(&paths::post(&post.id).unwrap(), post.to_fields().unwrap())
            .await
            .unwrap();
        (store, post)
    }

    async fn stored_likes(store: &InMemoryDocumentStore, post: &PostId) -> i64 {
        store
            .get(&paths::post(post).unwrap())
            .await
            .unwrap()
            .unwrap()
            .get_i64(fields::post::LIKES)
            .unwrap()
    }

    #[tokio::test]
    async fn overwrite_race_loses_an_update() {
        let (store, post) = seeded(5).await;
        let counter = LikeCounter::new(store.clone(), LikeMode::Overwrite);
        // Both callers hold the same stale copy with likes = 5.
        let (a, b) = tokio::join!(counter.like(&post), counter.like(&post));
        assert_eq!((a, b), (Some(6), Some(6)));
        assert_eq!(stored_likes(&store, &post.id).await, 6);
    }

    #[tokio::test]
    async fn atomic_race_counts_both() {
        let (store, post) = seeded(5).await;
        let counter = LikeCounter::new(store.clone(), LikeMode::Atomic);
        let (a, b) = tokio::join!(counter.like(&post), counter.like(&post));
        let mut seen = vec![a.unwrap(), b.unwrap()];
        seen.sort();
        assert_eq!(seen, vec![6, 7]);
        assert_eq!(stored_likes(&store, &post.id).await, 7);
    }

    #[tokio::test]
    async fn many_concurrent_increments() {
        let (store, post) = seeded(0).await;
        let counter = LikeCounter::new(store.clone(), LikeMode::Atomic);
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let counter = counter.clone();
            let id = post.id.clone();
            tasks.spawn(async move { counter.increment(&id).await.unwrap() });
        }
        while tasks.join_next().await.is_some() {}
        assert_eq!(stored_likes(&store, &post.id).await, 20);
    }

    #[tokio::test]
    async fn overwrite_failure_is_swallowed() {
        let (store, post) = seeded(5).await;
        store.set_unavailable(true);
        let counter = LikeCounter::new(store.clone(), LikeMode::Overwrite);
        assert_eq!(counter.like(&post).await, None);
        assert!(!counter.set_likes(&post.id, 9).await);
        store.set_unavailable(false);
        assert_eq!(stored_likes(&store, &post.id).await, 5);
    }

    #[tokio::test]
    async fn negative_stored_count_is_an_error() {
        let (store, post) = seeded(0).await;
        let mut corrupt = Fields::new();
        corrupt.insert(fields::post::LIKES.into(), Value::from(-3));
        store.update(&paths::post(&post.id).unwrap(), corrupt).await.unwrap();

        let counter = LikeCounter::new(store.clone(), LikeMode::Atomic);
        let err = counter.increment(&post.id).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidInput(_)));
        assert_eq!(counter.like(&post).await, None);
    }

    #[tokio::test]
    async fn missing_post_is_reported() {
        let (store, _) = seeded(0).await;
        let counter = LikeCounter::new(store.clone(), LikeMode::Atomic);
        let missing = PostId::new("nope").unwrap();
        assert!(matches!(
            counter.increment(&missing).await,
            Err(FeedError::PostNotFound(_))
        ));
        assert!(!counter.set_likes(&missing, 1).await);
        assert_eq!(store.len(), 1);
    }
}
