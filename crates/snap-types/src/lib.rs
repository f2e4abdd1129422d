//! Foundation types for Snapline.
//!
//! This crate provides the identity, temporal, and document-shaped model
//! types shared by every other Snapline crate.
//!
//! # Key Types
//!
//! - [`UserId`], [`PostId`], [`CommentId`] — opaque, validated identifiers
//! - [`Timestamp`] — wall-clock milliseconds used for feed ordering
//! - [`User`] — the signed-in account and its avatar
//! - [`Post`] — a feed entry with likes, location, and a comment counter
//! - [`Comment`] — a comment nested under a post, carrying a denormalized
//!   copy of its author's avatar
//! - [`fields`] — canonical collection and field names in the document store

pub mod error;
pub mod fields;
pub mod geo;
pub mod id;
pub mod model;
pub mod temporal;

pub use error::TypeError;
pub use geo::GeoPoint;
pub use id::{CommentId, PostId, UserId};
pub use model::{Comment, Post, User};
pub use temporal::Timestamp;
