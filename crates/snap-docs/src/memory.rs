//! In-memory document store for testing and embedding.
//!
//! [`InMemoryDocumentStore`] keeps every document in a `BTreeMap` behind a
//! `RwLock` and routes live-query snapshots while the write lock is held,
//! so watchers see commits in order. It is strongly consistent: group
//! queries observe every completed write.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::document::Document;
use crate::error::{DocError, DocResult};
use crate::path::DocumentPath;
use crate::query::Query;
use crate::traits::DocumentStore;
use crate::watch::{QueryWatch, WatchRouter};
use crate::write::{WriteBatch, WriteOp};

/// Default per-watch snapshot buffer.
pub const DEFAULT_WATCH_CAPACITY: usize = 64;

struct State {
    docs: BTreeMap<DocumentPath, Document>,
    version: u64,
}

/// Final state of every document touched by a batch (`None` = deleted).
type Staged = BTreeMap<DocumentPath, Option<Document>>;

/// An in-memory implementation of [`DocumentStore`].
///
/// Fault injection for tests: [`set_unavailable`](Self::set_unavailable)
/// fails every operation, and [`fail_writes_to`](Self::fail_writes_to)
/// rejects any batch touching the given document.
pub struct InMemoryDocumentStore {
    state: RwLock<State>,
    router: WatchRouter,
    unavailable: AtomicBool,
    failing: RwLock<HashSet<DocumentPath>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::with_watch_capacity(DEFAULT_WATCH_CAPACITY)
    }

    /// Create a store whose watches buffer up to `capacity` snapshots.
    pub fn with_watch_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(State {
                docs: BTreeMap::new(),
                version: 0,
            }),
            router: WatchRouter::new(capacity),
            unavailable: AtomicBool::new(false),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Toggle simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Reject every future write that touches `path`.
    pub fn fail_writes_to(&self, path: DocumentPath) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(path);
        }
    }

    /// Stop rejecting writes to every previously failing path.
    pub fn clear_write_failures(&self) {
        if let Ok(mut failing) = self.failing.write() {
            failing.clear();
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.docs.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current commit sequence.
    pub fn version(&self) -> u64 {
        self.state.read().map(|s| s.version).unwrap_or(0)
    }

    /// Number of live watches.
    pub fn watcher_count(&self) -> usize {
        self.router.watcher_count()
    }

    fn check_available(&self) -> DocResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }

    fn check_writable(&self, path: &DocumentPath) -> DocResult<()> {
        let failing = self.failing.read().map_err(|_| DocError::LockPoisoned)?;
        if failing.contains(path) {
            return Err(DocError::Unavailable(format!("write rejected for {path}")));
        }
        Ok(())
    }

    /// Validate and apply `ops` as one commit, then route snapshots.
    fn apply(&self, ops: Vec<WriteOp>) -> DocResult<Staged> {
        self.check_available()?;
        let mut state = self.state.write().map_err(|_| DocError::LockPoisoned)?;
        let version = state.version + 1;

        let mut staged = Staged::new();
        for op in ops {
            let path = op.path().clone();
            self.check_writable(&path)?;
            let current = match staged.get(&path) {
                Some(doc) => doc.clone(),
                None => state.docs.get(&path).cloned(),
            };
            let next = apply_op(op, current, version)?;
            staged.insert(path, next);
        }

        if staged.is_empty() {
            return Ok(staged);
        }
        state.version = version;
        for (path, doc) in &staged {
            match doc {
                Some(doc) => {
                    state.docs.insert(path.clone(), doc.clone());
                }
                None => {
                    state.docs.remove(path);
                }
            }
        }
        let changed: Vec<DocumentPath> = staged.keys().cloned().collect();
        debug!(version, writes = changed.len(), "commit applied");
        self.router.route(&changed, &state.docs, version);
        Ok(staged)
    }
}

fn apply_op(op: WriteOp, current: Option<Document>, version: u64) -> DocResult<Option<Document>> {
    match op {
        WriteOp::Set { path, fields } => Ok(Some(Document::new(path, fields, version))),
        WriteOp::Update { path, fields } => {
            let mut doc = current.ok_or_else(|| DocError::NotFound(path.clone()))?;
            doc.fields.extend(fields);
            doc.version = version;
            Ok(Some(doc))
        }
        WriteOp::Increment { path, field, by } => {
            let mut doc = current.ok_or_else(|| DocError::NotFound(path.clone()))?;
            let base = match doc.fields.get(&field) {
                None | Some(Value::Null) => 0,
                Some(value) => value.as_i64().ok_or_else(|| DocError::NotNumeric {
                    path: path.clone(),
                    field: field.clone(),
                })?,
            };
            doc.fields.insert(field, Value::from(base.saturating_add(by)));
            doc.version = version;
            Ok(Some(doc))
        }
        WriteOp::Delete { .. } => Ok(None),
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> DocResult<Option<Document>> {
        self.check_available()?;
        let state = self.state.read().map_err(|_| DocError::LockPoisoned)?;
        Ok(state.docs.get(path).cloned())
    }

    async fn query(&self, query: &Query) -> DocResult<Vec<Document>> {
        self.check_available()?;
        query.validate()?;
        let state = self.state.read().map_err(|_| DocError::LockPoisoned)?;
        Ok(query.run(state.docs.values()))
    }

    async fn commit(&self, batch: WriteBatch) -> DocResult<()> {
        batch.check_size()?;
        self.apply(batch.into_ops()).map(|_| ())
    }

    async fn increment(&self, path: &DocumentPath, field: &str, by: i64) -> DocResult<i64> {
        let staged = self.apply(vec![WriteOp::Increment {
            path: path.clone(),
            field: field.to_string(),
            by,
        }])?;
        staged
            .get(path)
            .and_then(|doc| doc.as_ref())
            .and_then(|doc| doc.get_i64(field))
            .ok_or_else(|| DocError::NotFound(path.clone()))
    }

    async fn watch(&self, query: Query) -> DocResult<QueryWatch> {
        self.check_available()?;
        query.validate()?;
        // Hold the read lock while registering so no commit slips between
        // the initial snapshot and the first routed change.
        let state = self.state.read().map_err(|_| DocError::LockPoisoned)?;
        let initial = query.run(state.docs.values());
        Ok(self.router.subscribe(query, initial, state.version))
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &self.len())
            .field("version", &self.version())
            .finish()
    }
}
