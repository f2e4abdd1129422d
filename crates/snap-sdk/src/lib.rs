//! High-level SDK for Snapline.
//!
//! [`Snapline`] wires the object store, the document store, and the feed
//! engine together behind one API and owns the signed-in session. This is
//! the main entry point for applications embedding the engine.

pub mod client;
pub mod error;

pub use client::{Snapline, DEFAULT_AVATAR_PLACEHOLDER};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use snap_feed::{
    FanoutReport, FeedConfig, FeedWatch, FileImage, ImageSource, MemoryImage, NewPost,
    StaticAuth, SubscriptionHandle,
};
pub use snap_types::{Comment, CommentId, GeoPoint, Post, PostId, Timestamp, User, UserId};
