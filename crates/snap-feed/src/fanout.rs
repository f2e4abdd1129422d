//! Propagation of a user's avatar to every comment they wrote.
//!
//! Comments carry a copy of their author's avatar URL so comment lists can
//! render without looking up users. When the avatar changes, every copy has
//! to be rewritten. [`AvatarFanout`] finds the copies with one group query
//! over all `comments` collections and rewrites them, either in bounded
//! atomic batches or as independent concurrent updates.
//!
//! Writes that fail are never hidden: they are listed in the returned
//! [`FanoutReport`], optionally after a configured number of retries.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use snap_docs::{DocError, DocumentPath, DocumentStore, Fields, Query, WriteBatch};
use snap_types::{fields, UserId};

use crate::config::{FanoutConfig, FanoutMode};
use crate::error::FeedResult;

/// A comment whose avatar copy could not be rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedWrite {
    pub path: DocumentPath,
    pub reason: String,
}

/// Outcome of one propagation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    /// Comments the query matched.
    pub matched: usize,
    /// Comments now carrying the new URL.
    pub updated: usize,
    /// Comments deleted between the query and the write.
    pub vanished: usize,
    /// Comments still carrying a stale URL.
    pub failed: Vec<FailedWrite>,
    /// Write passes made, including retries.
    pub attempts: u32,
}

impl FanoutReport {
    /// Returns `true` if no matched comment was left stale.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of one write pass over a set of paths.
#[derive(Default)]
struct Pass {
    updated: usize,
    vanished: usize,
    failed: Vec<FailedWrite>,
}

/// Rewrites denormalized avatar copies.
#[derive(Clone)]
pub struct AvatarFanout {
    docs: Arc<dyn DocumentStore>,
    config: FanoutConfig,
}

impl AvatarFanout {
    pub fn new(docs: Arc<dyn DocumentStore>, config: FanoutConfig) -> Self {
        Self { docs, config }
    }

    /// Every comment authored by `user`, across all posts.
    pub fn comments_by(user: &UserId) -> Query {
        Query::group(fields::COMMENTS).where_eq(fields::comment::AUTHOR_ID, user.as_str())
    }

    /// Set the avatar copy of every comment by `user` to `url`.
    ///
    /// A failing query aborts with its error and nothing is written. Write
    /// failures do not abort: they are retried up to `max_retries` times and
    /// whatever is still failing is returned in the report. Writes that did
    /// land are never rolled back.
    pub async fn propagate_avatar(&self, user: &UserId, url: &str) -> FeedResult<FanoutReport> {
        let matched = self.docs.query(&Self::comments_by(user)).await?;
        let mut pending: Vec<DocumentPath> = matched.into_iter().map(|doc| doc.path).collect();
        let mut report = FanoutReport {
            matched: pending.len(),
            ..FanoutReport::default()
        };
        debug!(%user, matched = report.matched, mode = ?self.config.mode, "propagating avatar");

        while !pending.is_empty() {
            report.attempts += 1;
            let pass = match self.config.mode {
                FanoutMode::Batched => self.write_batched(pending, url).await,
                FanoutMode::Independent => self.write_independent(pending, url).await,
            };
            report.updated += pass.updated;
            report.vanished += pass.vanished;
            if pass.failed.is_empty() || report.attempts > self.config.max_retries {
                report.failed = pass.failed;
                break;
            }
            warn!(
                %user,
                failed = pass.failed.len(),
                attempt = report.attempts,
                "retrying failed avatar writes"
            );
            pending = pass.failed.into_iter().map(|f| f.path).collect();
        }

        if report.is_complete() {
            info!(%user, updated = report.updated, "avatar propagated");
        } else {
            warn!(
                %user,
                updated = report.updated,
                failed = report.failed.len(),
                "avatar propagation incomplete"
            );
        }
        Ok(report)
    }

    async fn write_batched(&self, paths: Vec<DocumentPath>, url: &str) -> Pass {
        let mut pass = Pass::default();
        for chunk in paths.chunks(self.config.effective_batch_size()) {
            let mut chunk = chunk.to_vec();
            while !chunk.is_empty() {
                let mut batch = WriteBatch::new();
                for path in &chunk {
                    batch.update(path.clone(), avatar_fields(url));
                }
                match self.docs.commit(batch).await {
                    Ok(()) => {
                        pass.updated += chunk.len();
                        break;
                    }
                    // A comment deleted since the query sinks the whole batch;
                    // drop it and commit the rest again.
                    Err(DocError::NotFound(gone)) if chunk.contains(&gone) => {
                        debug!(path = %gone, "comment vanished before avatar write");
                        chunk.retain(|path| *path != gone);
                        pass.vanished += 1;
                    }
                    Err(e) => {
                        let reason = e.to_string();
                        pass.failed.extend(chunk.drain(..).map(|path| FailedWrite {
                            path,
                            reason: reason.clone(),
                        }));
                    }
                }
            }
        }
        pass
    }

    async fn write_independent(&self, paths: Vec<DocumentPath>, url: &str) -> Pass {
        let mut pass = Pass::default();
        let mut outstanding: HashSet<DocumentPath> = paths.iter().cloned().collect();
        let mut tasks = JoinSet::new();
        for path in paths {
            let docs = Arc::clone(&self.docs);
            let update = avatar_fields(url);
            tasks.spawn(async move {
                let result = docs.update(&path, update).await;
                (path, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (path, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "avatar write task failed");
                    continue;
                }
            };
            outstanding.remove(&path);
            match result {
                Ok(()) => pass.updated += 1,
                Err(DocError::NotFound(_)) => pass.vanished += 1,
                Err(e) => pass.failed.push(FailedWrite {
                    path,
                    reason: e.to_string(),
                }),
            }
        }
        // Tasks that panicked never reported back.
        pass.failed.extend(outstanding.into_iter().map(|path| FailedWrite {
            path,
            reason: "write task aborted".into(),
        }));
        pass
    }
}

fn avatar_fields(url: &str) -> Fields {
    let mut update = Fields::new();
    update.insert(fields::comment::AVATAR.into(), Value::from(url));
    update
}

impl std::fmt::Debug for AvatarFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarFanout")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use snap_docs::{DocResult, Document, InMemoryDocumentStore, QueryWatch};
    use snap_types::{Comment, CommentId, PostId, Timestamp};

    use crate::paths;

    async fn seed_comment(
        store: &InMemoryDocumentStore,
        post: &str,
        id: &str,
        author: &str,
        avatar: Option<&str>,
    ) -> DocumentPath {
        let comment = Comment {
            id: CommentId::new(id).unwrap(),
            post_id: PostId::new(post).unwrap(),
            author_id: UserId::new(author).unwrap(),
            avatar: avatar.map(str::to_string),
            text: format!("comment {id}"),
            created_date: Timestamp::from_millis(1),
        };
        let path = paths::comment(&comment.post_id, &comment.id).unwrap();
        store.set(&path, comment.to_fields().unwrap()).await.unwrap();
        path
    }

    /// Alice wrote five comments across three posts; Bob wrote two.
    async fn seeded() -> Arc<InMemoryDocumentStore> {
        let store = Arc::new(InMemoryDocumentStore::new());
        for (post, id) in [("p1", "a1"), ("p1", "a2"), ("p2", "a3"), ("p3", "a4"), ("p3", "a5")] {
            seed_comment(&store, post, id, "alice", Some("https://store/old")).await;
        }
        seed_comment(&store, "p1", "b1", "bob", Some("https://store/bob")).await;
        seed_comment(&store, "p2", "b2", "bob", None).await;
        store
    }

    async fn avatars_of(store: &InMemoryDocumentStore, author: &str) -> Vec<Option<String>> {
        let docs = store
            .query(&AvatarFanout::comments_by(&UserId::new(author).unwrap()))
            .await
            .unwrap();
        docs.iter()
            .map(|d| d.get_str(fields::comment::AVATAR).map(str::to_string))
            .collect()
    }

    fn fanout(store: &Arc<InMemoryDocumentStore>, config: FanoutConfig) -> AvatarFanout {
        AvatarFanout::new(store.clone(), config)
    }

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    // ---- Complete propagation ----

    #[tokio::test]
    async fn batched_updates_every_comment_by_author() {
        let store = seeded().await;
        let report = fanout(&store, FanoutConfig::default())
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.matched, 5);
        assert_eq!(report.updated, 5);
        assert_eq!(report.attempts, 1);
        assert!(avatars_of(&store, "alice")
            .await
            .iter()
            .all(|a| a.as_deref() == Some("https://store/new")));
        assert_eq!(
            avatars_of(&store, "bob").await,
            vec![Some("https://store/bob".to_string()), None]
        );
    }

    #[tokio::test]
    async fn small_batches_cover_all_comments() {
        let store = seeded().await;
        let version_before = store.version();
        let config = FanoutConfig {
            batch_size: 2,
            ..FanoutConfig::default()
        };
        let report = fanout(&store, config)
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap();
        assert_eq!(report.updated, 5);
        // 5 comments in batches of 2.
        assert_eq!(store.version() - version_before, 3);
    }

    #[tokio::test]
    async fn independent_updates_every_comment_by_author() {
        let store = seeded().await;
        let config = FanoutConfig {
            mode: FanoutMode::Independent,
            ..FanoutConfig::default()
        };
        let report = fanout(&store, config)
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.updated, 5);
        assert!(avatars_of(&store, "alice")
            .await
            .iter()
            .all(|a| a.as_deref() == Some("https://store/new")));
    }

    #[tokio::test]
    async fn user_without_comments_is_a_no_op() {
        let store = seeded().await;
        let version = store.version();
        let report = fanout(&store, FanoutConfig::default())
            .propagate_avatar(&UserId::new("carol").unwrap(), "https://store/new")
            .await
            .unwrap();
        assert_eq!(report, FanoutReport::default());
        assert_eq!(store.version(), version);
    }

    // ---- Failures ----

    #[tokio::test]
    async fn query_failure_aborts() {
        let store = seeded().await;
        store.set_unavailable(true);
        let err = fanout(&store, FanoutConfig::default())
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::FeedError::Doc(DocError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_is_reported_and_others_land() {
        let store = seeded().await;
        let bad = paths::comment(&PostId::new("p2").unwrap(), &CommentId::new("a3").unwrap()).unwrap();
        store.fail_writes_to(bad.clone());
        let config = FanoutConfig {
            mode: FanoutMode::Independent,
            ..FanoutConfig::default()
        };
        let report = fanout(&store, config)
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.updated, 4);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, bad);
        let stale = store.get(&bad).await.unwrap().unwrap();
        assert_eq!(stale.get_str(fields::comment::AVATAR), Some("https://store/old"));
    }

    #[tokio::test]
    async fn failed_batch_reports_every_member() {
        let store = seeded().await;
        let bad = paths::comment(&PostId::new("p1").unwrap(), &CommentId::new("a1").unwrap()).unwrap();
        store.fail_writes_to(bad);
        let config = FanoutConfig {
            batch_size: 2,
            ..FanoutConfig::default()
        };
        let report = fanout(&store, config)
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap();
        // The batch holding a1 also held a2; both stay stale.
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.updated, 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let store = seeded().await;
        let bad = paths::comment(&PostId::new("p3").unwrap(), &CommentId::new("a5").unwrap()).unwrap();
        store.fail_writes_to(bad);
        let config = FanoutConfig {
            batch_size: 1,
            max_retries: 2,
            ..FanoutConfig::default()
        };
        let report = fanout(&store, config)
            .propagate_avatar(&alice(), "https://store/new")
            .await
            .unwrap();
        assert_eq!(report.attempts, 3);
        assert_eq!(report.updated, 4);
        assert_eq!(report.failed.len(), 1);
    }

    // ---- Concurrent deletion ----

    /// Deletes one comment right after every query, as if its author
    /// removed it while the fan-out was running.
    struct DeletingStore {
        inner: Arc<InMemoryDocumentStore>,
        victim: DocumentPath,
    }

    #[async_trait]
    impl DocumentStore for DeletingStore {
        async fn get(&self, path: &DocumentPath) -> DocResult<Option<Document>> {
            self.inner.get(path).await
        }

        async fn query(&self, query: &Query) -> DocResult<Vec<Document>> {
            let result = self.inner.query(query).await?;
            self.inner.delete(&self.victim).await?;
            Ok(result)
        }

        async fn commit(&self, batch: WriteBatch) -> DocResult<()> {
            self.inner.commit(batch).await
        }

        async fn increment(&self, path: &DocumentPath, field: &str, by: i64) -> DocResult<i64> {
            self.inner.increment(path, field, by).await
        }

        async fn watch(&self, query: Query) -> DocResult<QueryWatch> {
            self.inner.watch(query).await
        }
    }

    #[tokio::test]
    async fn vanished_comments_are_skipped() {
        for mode in [FanoutMode::Batched, FanoutMode::Independent] {
            let inner = seeded().await;
            let victim =
                paths::comment(&PostId::new("p2").unwrap(), &CommentId::new("a3").unwrap()).unwrap();
            let store = Arc::new(DeletingStore {
                inner: inner.clone(),
                victim,
            });
            let config = FanoutConfig {
                mode,
                ..FanoutConfig::default()
            };
            let report = AvatarFanout::new(store, config)
                .propagate_avatar(&alice(), "https://store/new")
                .await
                .unwrap();
            assert!(report.is_complete(), "{mode:?}");
            assert_eq!(report.matched, 5);
            assert_eq!(report.vanished, 1);
            assert_eq!(report.updated, 4);
        }
    }
}
