//! Live feed of one user's posts.
//!
//! The feed is the result of `posts where userId == user order by
//! createdDate desc`, pushed as a complete list every time it changes.
//! [`FeedWatch`] is the pull form; [`FeedSubscription`] drives a callback
//! from a background task until its [`SubscriptionHandle`] is cancelled.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use snap_docs::{Direction, DocumentStore, Query, QuerySnapshot, QueryWatch};
use snap_types::{fields, Post, UserId};

use crate::error::FeedResult;
use crate::paths;

/// The query behind a user's feed.
pub fn feed_query(user: &UserId) -> FeedResult<Query> {
    Ok(Query::collection(paths::posts()?)
        .where_eq(fields::post::USER_ID, user.as_str())
        .order_by(fields::post::CREATED_DATE, Direction::Descending))
}

fn decode_snapshot(user: &UserId, snapshot: &QuerySnapshot) -> Vec<Post> {
    snapshot
        .documents
        .iter()
        .filter_map(|doc| match paths::decode_post(doc) {
            Ok(post) => Some(post),
            Err(e) => {
                warn!(%user, path = %doc.path, error = %e, "skipping undecodable post");
                None
            }
        })
        .collect()
}

/// Pull stream of feed snapshots. The first snapshot is the current feed.
#[derive(Debug)]
pub struct FeedWatch {
    user: UserId,
    watch: QueryWatch,
}

impl FeedWatch {
    pub async fn open(docs: &dyn DocumentStore, user: &UserId) -> FeedResult<Self> {
        let watch = docs.watch(feed_query(user)?).await?;
        Ok(Self {
            user: user.clone(),
            watch,
        })
    }

    /// Wait for the next feed. `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Vec<Post>> {
        let snapshot = self.watch.next().await?;
        debug!(user = %self.user, version = snapshot.version, "feed snapshot");
        Some(decode_snapshot(&self.user, &snapshot))
    }

    /// The newest feed already queued, if any, without waiting.
    pub fn latest(&mut self) -> Option<Vec<Post>> {
        self.watch
            .latest()
            .map(|snapshot| decode_snapshot(&self.user, &snapshot))
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }
}

thread_local! {
    /// Identity of the subscription whose callback is running on this thread.
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

struct Shared {
    cancelled: AtomicBool,
    /// Held for the whole duration of each callback.
    gate: Mutex<()>,
}

impl Shared {
    fn id(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

/// Push-style feed delivery.
pub struct FeedSubscription;

impl FeedSubscription {
    /// Call `on_update` with the user's feed now and after every change.
    ///
    /// Opening the watch happens before this returns, so a store error is
    /// reported here rather than swallowed by the background task.
    pub async fn subscribe<F>(
        docs: Arc<dyn DocumentStore>,
        user: &UserId,
        mut on_update: F,
    ) -> FeedResult<SubscriptionHandle>
    where
        F: FnMut(Vec<Post>) + Send + 'static,
    {
        let mut watch = FeedWatch::open(docs.as_ref(), user).await?;
        let shared = Arc::new(Shared {
            cancelled: AtomicBool::new(false),
            gate: Mutex::new(()),
        });

        let task_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            while let Some(posts) = watch.next().await {
                let _gate = task_shared.gate.lock().unwrap_or_else(|e| e.into_inner());
                if task_shared.cancelled.load(Ordering::SeqCst) {
                    break;
                }
                let previous = DELIVERING.with(|d| d.replace(task_shared.id()));
                on_update(posts);
                DELIVERING.with(|d| d.set(previous));
            }
            debug!(user = %watch.user(), "feed subscription stopped");
        });

        debug!(%user, "feed subscription started");
        Ok(SubscriptionHandle { shared, task })
    }
}

/// Cancels a [`FeedSubscription`]; dropping it cancels too.
pub struct SubscriptionHandle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Stop delivery. When this returns no callback is running and none
    /// will start. Calling it again does nothing.
    ///
    /// Blocks the calling thread until an in-flight callback on another
    /// thread returns; from inside the subscription's own callback it
    /// returns immediately. Called from async code this holds a runtime
    /// worker for as long as that callback runs, so callbacks must stay
    /// short and must not wait on other tasks.
    pub fn cancel(&self) {
        if self.shared.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let in_own_callback = DELIVERING.with(|d| d.get() == self.shared.id());
        if !in_own_callback {
            drop(self.shared.gate.lock().unwrap_or_else(|e| e.into_inner()));
        }
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
