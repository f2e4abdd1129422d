//! Document locations of posts, comments, and user profiles.

use snap_docs::{CollectionPath, Document, DocumentPath};
use snap_types::{fields, Comment, CommentId, Post, PostId, UserId};

use crate::error::{FeedError, FeedResult};

pub fn posts() -> FeedResult<CollectionPath> {
    Ok(CollectionPath::parse(fields::POSTS)?)
}

pub fn post(id: &PostId) -> FeedResult<DocumentPath> {
    Ok(posts()?.doc(id.as_str())?)
}

pub fn comments(post_id: &PostId) -> FeedResult<CollectionPath> {
    Ok(post(post_id)?.collection(fields::COMMENTS)?)
}

pub fn comment(post_id: &PostId, id: &CommentId) -> FeedResult<DocumentPath> {
    Ok(comments(post_id)?.doc(id.as_str())?)
}

pub fn user(id: &UserId) -> FeedResult<DocumentPath> {
    Ok(CollectionPath::parse(fields::USERS)?.doc(id.as_str())?)
}

/// Decode a `posts/{id}` document.
pub fn decode_post(doc: &Document) -> FeedResult<Post> {
    let id = PostId::new(doc.id())?;
    Ok(Post::from_fields(id, &doc.fields)?)
}

/// Decode a `posts/{postId}/comments/{id}` document.
pub fn decode_comment(doc: &Document) -> FeedResult<Comment> {
    let post_path = doc.path.parent().parent().ok_or_else(|| {
        FeedError::InvalidInput(format!("{} is not nested under a post", doc.path))
    })?;
    let post_id = PostId::new(post_path.id())?;
    let id = CommentId::new(doc.id())?;
    Ok(Comment::from_fields(post_id, id, &doc.fields)?)
}
