//! The [`DocumentStore`] trait defining the document storage interface.
//!
//! Any backend (in-memory, hosted database client) implements this trait to
//! serve the feed engine.

use async_trait::async_trait;

use crate::document::Document;
use crate::error::DocResult;
use crate::path::DocumentPath;
use crate::query::Query;
use crate::watch::QueryWatch;
use crate::write::{WriteBatch, WriteOp};
use crate::Fields;

/// Storage backend for documents.
///
/// Implementations must be thread-safe (`Send + Sync`) and guarantee:
///
/// - Per-document write atomicity; no cross-document locking is offered
///   beyond [`commit`](Self::commit).
/// - `commit` applies every write of a batch or none of them.
/// - A query observes every write whose call returned before the query
///   started. Backends with weaker group-query consistency must say so in
///   their own documentation.
/// - Watches deliver snapshots in commit order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. Returns `Ok(None)` if it does not exist.
    async fn get(&self, path: &DocumentPath) -> DocResult<Option<Document>>;

    /// Evaluate a query once.
    async fn query(&self, query: &Query) -> DocResult<Vec<Document>>;

    /// Apply a batch of writes atomically.
    async fn commit(&self, batch: WriteBatch) -> DocResult<()>;

    /// Atomically add `by` to an integer field and return the new value.
    async fn increment(&self, path: &DocumentPath, field: &str, by: i64) -> DocResult<i64>;

    /// Start a live query. The first snapshot is the current result.
    async fn watch(&self, query: Query) -> DocResult<QueryWatch>;

    /// Create or replace a document.
    async fn set(&self, path: &DocumentPath, fields: Fields) -> DocResult<()> {
        self.commit(WriteBatch::from(vec![WriteOp::Set {
            path: path.clone(),
            fields,
        }]))
        .await
    }

    /// Merge fields into an existing document; `NotFound` if absent.
    async fn update(&self, path: &DocumentPath, fields: Fields) -> DocResult<()> {
        self.commit(WriteBatch::from(vec![WriteOp::Update {
            path: path.clone(),
            fields,
        }]))
        .await
    }

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, path: &DocumentPath) -> DocResult<()> {
        self.commit(WriteBatch::from(vec![WriteOp::Delete { path: path.clone() }]))
            .await
    }
}
