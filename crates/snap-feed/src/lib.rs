//! Feed synchronization and denormalized-state propagation for Snapline.
//!
//! This crate is the engine behind the profile screen:
//!
//! - [`MediaUploader`] uploads a picked image and returns its durable URL
//! - [`AvatarFanout`] rewrites the avatar copy on every comment a user wrote
//! - [`AvatarWorkflow`] runs upload, fan-out, then session update, in order
//! - [`FeedSubscription`] and [`FeedWatch`] deliver a user's posts, newest
//!   first, as full snapshots on every remote change
//! - [`LikeCounter`] writes like counts, atomically or last-write-wins
//! - [`PostPublisher`] creates posts and comments
//! - [`Session`] holds the signed-in user from sign-in to sign-out
//!
//! All storage goes through the [`snap_blob::ObjectStore`] and
//! [`snap_docs::DocumentStore`] seams. Nothing here retries on its own
//! unless [`FeedConfig`] asks for it.

pub mod config;
pub mod error;
pub mod fanout;
pub mod feed;
pub mod likes;
pub mod media;
pub mod paths;
pub mod posts;
pub mod profile;
pub mod session;

pub use config::{
    FanoutConfig, FanoutMode, FeedConfig, LikeMode, LikesConfig, ProfileConfig, StorageConfig,
};
pub use error::{FeedError, FeedResult};
pub use fanout::{AvatarFanout, FailedWrite, FanoutReport};
pub use feed::{feed_query, FeedSubscription, FeedWatch, SubscriptionHandle};
pub use likes::LikeCounter;
pub use media::{FileImage, ImageSource, MediaUploader, MemoryImage};
pub use posts::{NewPost, PostPublisher};
pub use profile::AvatarWorkflow;
pub use session::{AuthProvider, Session, StaticAuth};
