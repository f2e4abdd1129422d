//! Snapshot delivery for live queries.
//!
//! Every watch receives the complete current result of its query, never a
//! diff. A consumer that falls behind may skip intermediate snapshots;
//! since each snapshot is complete, the latest one it receives is always
//! authoritative.

use std::collections::BTreeMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

use crate::document::Document;
use crate::path::DocumentPath;
use crate::query::Query;

/// The full result of a watched query at one point in the write order.
#[derive(Clone, Debug, PartialEq)]
pub struct QuerySnapshot {
    pub documents: Vec<Document>,
    /// Commit sequence of the store when the snapshot was taken.
    pub version: u64,
}

/// Receiving side of a live query.
///
/// Dropping the watch unregisters it from the store.
#[derive(Debug)]
pub struct QueryWatch {
    rx: broadcast::Receiver<QuerySnapshot>,
}

impl QueryWatch {
    pub fn new(rx: broadcast::Receiver<QuerySnapshot>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<QuerySnapshot> {
        loop {
            match self.rx.recv().await {
                Ok(snapshot) => return Some(snapshot),
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "watch lagged, skipping to newer snapshots");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next snapshot if one is already queued.
    pub fn try_next(&mut self) -> Option<QuerySnapshot> {
        loop {
            match self.rx.try_recv() {
                Ok(snapshot) => return Some(snapshot),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything queued and return only the newest snapshot.
    pub fn latest(&mut self) -> Option<QuerySnapshot> {
        let mut latest = None;
        while let Some(snapshot) = self.try_next() {
            latest = Some(snapshot);
        }
        latest
    }
}

/// Identity of a result set: which documents, at which write.
type ResultKey = Vec<(DocumentPath, u64)>;

fn result_key(documents: &[Document]) -> ResultKey {
    documents
        .iter()
        .map(|d| (d.path.clone(), d.version))
        .collect()
}

/// Internal watcher: a query paired with a broadcast sender.
struct Watcher {
    query: Query,
    last: ResultKey,
    sender: broadcast::Sender<QuerySnapshot>,
}

/// Fan-out router that re-evaluates watched queries after each commit.
///
/// Backends call [`route`](Self::route) while still holding their write
/// lock so snapshots are delivered in commit order.
pub struct WatchRouter {
    watchers: Mutex<Vec<Watcher>>,
    capacity: usize,
}

impl WatchRouter {
    pub fn new(capacity: usize) -> Self {
        Self {
            watchers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a watcher and queue its initial snapshot.
    pub fn subscribe(&self, query: Query, initial: Vec<Document>, version: u64) -> QueryWatch {
        let (tx, rx) = broadcast::channel(self.capacity);
        let last = result_key(&initial);
        // The receiver is alive, so this send cannot fail.
        let _ = tx.send(QuerySnapshot {
            documents: initial,
            version,
        });
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.push(Watcher {
            query,
            last,
            sender: tx,
        });
        QueryWatch::new(rx)
    }

    /// Re-evaluate every watcher touched by `changed` against `docs`.
    ///
    /// A snapshot is sent only when the result set actually differs from
    /// the last one delivered. Watchers whose receivers are gone are pruned.
    pub fn route(
        &self,
        changed: &[DocumentPath],
        docs: &BTreeMap<DocumentPath, Document>,
        version: u64,
    ) {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain_mut(|watcher| {
            if watcher.sender.receiver_count() == 0 {
                return false;
            }
            if !changed.iter().any(|path| watcher.query.in_scope(path)) {
                return true;
            }
            let documents = watcher.query.run(docs.values());
            let key = result_key(&documents);
            if key == watcher.last {
                return true;
            }
            watcher.last = key;
            watcher
                .sender
                .send(QuerySnapshot { documents, version })
                .is_ok()
        });
    }

    /// Number of live watchers.
    pub fn watcher_count(&self) -> usize {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain(|w| w.sender.receiver_count() > 0);
        watchers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::CollectionPath;
    use crate::query::Direction;
    use serde_json::json;

    fn doc(path: &str, fields: serde_json::Value, version: u64) -> Document {
        Document::new(
            DocumentPath::parse(path).unwrap(),
            fields.as_object().unwrap().clone(),
            version,
        )
    }

    fn user_posts(user: &str) -> Query {
        Query::collection(CollectionPath::parse("posts").unwrap())
            .where_eq("userId", user)
            .order_by("createdDate", Direction::Descending)
    }

    #[test]
    fn initial_snapshot_is_queued() {
        let router = WatchRouter::new(8);
        let mut watch = router.subscribe(user_posts("u1"), vec![], 0);
        let snap = watch.try_next().unwrap();
        assert!(snap.documents.is_empty());
        assert!(watch.try_next().is_none());
        assert_eq!(router.watcher_count(), 1);
    }

    #[test]
    fn routes_only_on_result_change() {
        let router = WatchRouter::new(8);
        let mut watch = router.subscribe(user_posts("u1"), vec![], 0);
        watch.try_next();

        let mut docs = BTreeMap::new();
        let other = doc("posts/x", json!({ "userId": "u2", "createdDate": 1 }), 1);
        docs.insert(other.path.clone(), other.clone());
        router.route(&[other.path.clone()], &docs, 1);
        assert!(watch.try_next().is_none(), "other user's post must not notify");

        let mine = doc("posts/y", json!({ "userId": "u1", "createdDate": 2 }), 2);
        docs.insert(mine.path.clone(), mine.clone());
        router.route(&[mine.path.clone()], &docs, 2);
        let snap = watch.try_next().unwrap();
        assert_eq!(snap.documents, vec![mine]);
        assert_eq!(snap.version, 2);
    }

    #[test]
    fn out_of_scope_changes_are_ignored() {
        let router = WatchRouter::new(8);
        let mut watch = router.subscribe(user_posts("u1"), vec![], 0);
        watch.try_next();
        let comment = doc("posts/y/comments/c", json!({ "userId": "u1", "createdDate": 2 }), 1);
        let mut docs = BTreeMap::new();
        docs.insert(comment.path.clone(), comment.clone());
        router.route(&[comment.path.clone()], &docs, 1);
        assert!(watch.try_next().is_none());
    }

    #[test]
    fn dropped_watch_is_pruned() {
        let router = WatchRouter::new(8);
        let watch = router.subscribe(user_posts("u1"), vec![], 0);
        assert_eq!(router.watcher_count(), 1);
        drop(watch);
        assert_eq!(router.watcher_count(), 0);
    }

    #[test]
    fn lagging_watch_still_reaches_latest() {
        let router = WatchRouter::new(2);
        let mut watch = router.subscribe(user_posts("u1"), vec![], 0);
        let mut docs = BTreeMap::new();
        for i in 1..=10u64 {
            let d = doc(&format!("posts/p{i}"), json!({ "userId": "u1", "createdDate": i }), i);
            docs.insert(d.path.clone(), d.clone());
            router.route(&[d.path.clone()], &docs, i);
        }
        let latest = watch.latest().unwrap();
        assert_eq!(latest.version, 10);
        assert_eq!(latest.documents.len(), 10);
        assert_eq!(latest.documents[0].id(), "p10");
    }
}
