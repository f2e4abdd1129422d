//! Binary object storage for Snapline.
//!
//! Images (avatars, post photos) live in an external object store addressed
//! by slash-separated paths such as `userAvatars/{key}`. This crate defines
//! the narrow interface the feed engine needs from that store and an
//! in-memory backend for tests and embedding.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. A `put` to an existing path replaces the object.
//! 2. A durable URL can only be resolved for an object that exists.
//! 3. The store never interprets object contents.
//! 4. All backend errors are propagated, never retried here.

pub mod error;
pub mod memory;
pub mod path;
pub mod traits;

pub use error::{BlobError, BlobResult};
pub use memory::InMemoryObjectStore;
pub use path::{ObjectMetadata, ObjectPath, ObjectRef};
pub use traits::ObjectStore;
