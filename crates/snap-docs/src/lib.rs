//! Document storage for Snapline.
//!
//! Posts, comments, and user profiles live in a hosted document database
//! organized as collections of JSON-like documents, where documents may own
//! sub-collections (`posts/{postId}/comments/{commentId}`). This crate
//! defines the subset of that database the feed engine relies on:
//!
//! - **Collection- and group-scoped queries** with equality and range
//!   filters, ordering, and limits ([`Query`])
//! - **Field-level writes**: set, merge-update, atomic increment, delete
//! - **Bounded atomic batches** ([`WriteBatch`])
//! - **Live query watches** ([`QueryWatch`]) that push the full result set
//!   whenever it changes
//!
//! # Modules
//!
//! - [`error`] — Error types for document operations
//! - [`path`] — [`CollectionPath`] and [`DocumentPath`]
//! - [`document`] — The stored [`Document`]
//! - [`query`] — Query model and in-process evaluation
//! - [`write`] — [`WriteOp`] and [`WriteBatch`]
//! - [`watch`] — Snapshot delivery for live queries
//! - [`traits`] — The [`DocumentStore`] trait
//! - [`memory`] — In-memory [`InMemoryDocumentStore`] for tests and embedding

pub mod document;
pub mod error;
pub mod memory;
pub mod path;
pub mod query;
pub mod traits;
pub mod watch;
pub mod write;

pub use document::Document;
pub use error::{DocError, DocResult};
pub use memory::InMemoryDocumentStore;
pub use path::{CollectionPath, DocumentPath};
pub use query::{Direction, Filter, FilterOp, OrderBy, Query, Scope};
pub use traits::DocumentStore;
pub use watch::{QuerySnapshot, QueryWatch};
pub use write::{WriteBatch, WriteOp, MAX_BATCH_WRITES};

/// Field map of a document.
pub type Fields = serde_json::Map<String, serde_json::Value>;
