//! Collection and field names as stored in the document store.
//!
//! The mobile client reads these documents directly, so the names are part
//! of the storage contract and must not drift.

/// Top-level collection holding every post.
pub const POSTS: &str = "posts";
/// Sub-collection under each post holding its comments.
pub const COMMENTS: &str = "comments";
/// Top-level collection holding user profiles.
pub const USERS: &str = "users";

pub mod post {
    pub const USER_ID: &str = "userId";
    pub const PHOTO: &str = "photo";
    pub const TITLE: &str = "title";
    pub const CREATED_DATE: &str = "createdDate";
    pub const LIKES: &str = "likes";
    pub const LOCATION: &str = "location";
    pub const PLACE: &str = "place";
    pub const COMMENTS_QUANTITY: &str = "commentsQuantity";
}

pub mod comment {
    pub const AUTHOR_ID: &str = "authorCommentId";
    pub const AVATAR: &str = "avatar";
    pub const TEXT: &str = "comment";
    pub const CREATED_DATE: &str = "createdDate";
}

pub mod user {
    pub const LOGIN: &str = "login";
    pub const EMAIL: &str = "email";
    pub const AVATAR: &str = "avatar";
}
