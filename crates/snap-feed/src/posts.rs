//! Post and comment creation.

use std::sync::Arc;

use tracing::info;

use snap_blob::ObjectStore;
use snap_docs::{DocError, Direction, DocumentStore, Query, WriteBatch};
use snap_types::{fields, Comment, CommentId, GeoPoint, Post, PostId, Timestamp};

use crate::config::StorageConfig;
use crate::error::{FeedError, FeedResult};
use crate::media::{ImageSource, MediaUploader};
use crate::paths;
use crate::session::Session;

/// What the user filled in on the create-post screen.
pub struct NewPost<'a> {
    pub photo: &'a dyn ImageSource,
    pub title: String,
    pub location: Option<GeoPoint>,
    pub place: String,
}

impl<'a> NewPost<'a> {
    pub fn new(photo: &'a dyn ImageSource, title: impl Into<String>) -> Self {
        Self {
            photo,
            title: title.into(),
            location: None,
            place: String::new(),
        }
    }

    pub fn at(mut self, location: GeoPoint, place: impl Into<String>) -> Self {
        self.location = Some(location);
        self.place = place.into();
        self
    }
}

#[derive(Clone)]
pub struct PostPublisher {
    uploader: MediaUploader,
    docs: Arc<dyn DocumentStore>,
}

impl PostPublisher {
    pub fn new(objects: Arc<dyn ObjectStore>, docs: Arc<dyn DocumentStore>, layout: StorageConfig) -> Self {
        Self {
            uploader: MediaUploader::new(objects, layout),
            docs,
        }
    }

    /// Upload the photo and publish a post owned by the session user.
    pub async fn create_post(&self, session: &Session, new: NewPost<'_>) -> FeedResult<Post> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(FeedError::InvalidInput("post title must not be empty".into()));
        }
        let photo = self.uploader.upload_post_photo(new.photo).await?;
        let post = Post {
            id: PostId::generate(),
            user_id: session.user_id(),
            photo,
            title: title.to_string(),
            created_date: Timestamp::now(),
            likes: 0,
            location: new.location,
            place: new.place,
            comments_quantity: 0,
        };
        self.docs.set(&paths::post(&post.id)?, post.to_fields()?).await?;
        info!(post = %post.id, user = %post.user_id, "post created");
        Ok(post)
    }

    /// Comment on a post as the session user.
    ///
    /// The comment carries the author's current avatar, and the post's
    /// comment count is bumped in the same atomic batch.
    pub async fn add_comment(&self, session: &Session, post: &PostId, text: &str) -> FeedResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeedError::InvalidInput("comment must not be empty".into()));
        }
        let comment = Comment {
            id: CommentId::generate(),
            post_id: post.clone(),
            author_id: session.user_id(),
            avatar: session.avatar(),
            text: text.to_string(),
            created_date: Timestamp::now(),
        };
        let post_path = paths::post(post)?;
        let mut batch = WriteBatch::new();
        batch
            .set(paths::comment(post, &comment.id)?, comment.to_fields()?)
            .increment(post_path.clone(), fields::post::COMMENTS_QUANTITY, 1);
        self.docs.commit(batch).await.map_err(|e| match e {
            DocError::NotFound(path) if path == post_path => FeedError::PostNotFound(post.clone()),
            other => FeedError::Doc(other),
        })?;
        info!(%post, comment = %comment.id, author = %comment.author_id, "comment added");
        Ok(comment)
    }

    /// Comments under a post, oldest first.
    pub async fn comments(&self, post: &PostId) -> FeedResult<Vec<Comment>> {
        let query = Query::collection(paths::comments(post)?)
            .order_by(fields::comment::CREATED_DATE, Direction::Ascending);
        let docs = self.docs.query(&query).await?;
        docs.iter().map(paths::decode_comment).collect()
    }
}

impl std::fmt::Debug for PostPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostPublisher")
            .field("uploader", &self.uploader)
            .finish_non_exhaustive()
    }
}
