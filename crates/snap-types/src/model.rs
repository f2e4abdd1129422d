//! Document-shaped model types.
//!
//! Each type converts to and from the field map stored in the document
//! store. The identity of a document lives in its path, not in its fields,
//! so decoding takes the id(s) separately.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::geo::GeoPoint;
use crate::id::{CommentId, PostId, UserId};
use crate::temporal::Timestamp;

/// The signed-in account as seen by the feed engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub email: String,
    /// Durable avatar URL; `None` until the user picks one.
    pub avatar: Option<String>,
}

impl User {
    pub fn new(id: UserId, login: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            login: login.into(),
            email: email.into(),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    /// Returns `true` if the user has an avatar other than the default image.
    ///
    /// Default images are recognized by their URL, which is how the mobile
    /// client decides between the "pick" and "remove" avatar actions.
    pub fn has_custom_avatar(&self) -> bool {
        match &self.avatar {
            Some(url) => !url.contains("default"),
            None => false,
        }
    }

    /// Profile document fields (`users/{id}`).
    pub fn to_fields(&self) -> Result<Map<String, Value>, TypeError> {
        to_map(&UserRecord {
            login: self.login.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        })
    }
}

/// A feed entry owned by one user.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub photo: String,
    pub title: String,
    pub created_date: Timestamp,
    pub likes: u64,
    pub location: Option<GeoPoint>,
    pub place: String,
    /// Denormalized count of comments under this post.
    pub comments_quantity: u64,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(default)]
    login: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostRecord {
    user_id: UserId,
    #[serde(default)]
    photo: String,
    #[serde(default)]
    title: String,
    created_date: Timestamp,
    #[serde(default, deserialize_with = "count")]
    likes: u64,
    #[serde(default)]
    location: Option<GeoPoint>,
    #[serde(default)]
    place: String,
    #[serde(default, deserialize_with = "count")]
    comments_quantity: u64,
}

impl Post {
    pub fn to_fields(&self) -> Result<Map<String, Value>, TypeError> {
        to_map(&PostRecord {
            user_id: self.user_id.clone(),
            photo: self.photo.clone(),
            title: self.title.clone(),
            created_date: self.created_date,
            likes: self.likes,
            location: self.location,
            place: self.place.clone(),
            comments_quantity: self.comments_quantity,
        })
    }

    pub fn from_fields(id: PostId, fields: &Map<String, Value>) -> Result<Self, TypeError> {
        let record: PostRecord = from_map("post", id.as_str(), fields)?;
        Ok(Self {
            id,
            user_id: record.user_id,
            photo: record.photo,
            title: record.title,
            created_date: record.created_date,
            likes: record.likes,
            location: record.location,
            place: record.place,
            comments_quantity: record.comments_quantity,
        })
    }
}

/// A comment nested under a post.
///
/// `avatar` is a copy of the author's avatar URL at the time it was last
/// propagated, kept so comment lists render without a user lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub avatar: Option<String>,
    pub text: String,
    pub created_date: Timestamp,
}

#[derive(Serialize, Deserialize)]
struct CommentRecord {
    #[serde(rename = "authorCommentId")]
    author_id: UserId,
    #[serde(default)]
    avatar: Option<String>,
    #[serde(rename = "comment", default)]
    text: String,
    #[serde(rename = "createdDate")]
    created_date: Timestamp,
}

impl Comment {
    pub fn to_fields(&self) -> Result<Map<String, Value>, TypeError> {
        to_map(&CommentRecord {
            author_id: self.author_id.clone(),
            avatar: self.avatar.clone(),
            text: self.text.clone(),
            created_date: self.created_date,
        })
    }

    pub fn from_fields(
        post_id: PostId,
        id: CommentId,
        fields: &Map<String, Value>,
    ) -> Result<Self, TypeError> {
        let record: CommentRecord = from_map("comment", id.as_str(), fields)?;
        Ok(Self {
            id,
            post_id,
            author_id: record.author_id,
            avatar: record.avatar,
            text: record.text,
            created_date: record.created_date,
        })
    }
}

/// Counters written by other clients may arrive as whole floats (`5.0`).
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let n = serde_json::Number::deserialize(deserializer)?;
    if let Some(v) = n.as_u64() {
        return Ok(v);
    }
    match n.as_f64() {
        Some(f) if f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64 => Ok(f as u64),
        _ => Err(D::Error::custom(format!(
            "expected a non-negative whole count, got {n}"
        ))),
    }
}

fn to_map<T: Serialize>(record: &T) -> Result<Map<String, Value>, TypeError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(TypeError::Serialization(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(TypeError::Serialization(e.to_string())),
    }
}

fn from_map<T: DeserializeOwned>(
    kind: &'static str,
    id: &str,
    fields: &Map<String, Value>,
) -> Result<T, TypeError> {
    serde_json::from_value(Value::Object(fields.clone())).map_err(|e| TypeError::Decode {
        kind,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use serde_json::json;

    fn uid(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn sample_post() -> Post {
        Post {
            id: PostId::new("p1").unwrap(),
            user_id: uid("alice"),
            photo: "https://store/postImages/1".into(),
            title: "Sunset".into(),
            created_date: Timestamp::from_millis(1_000),
            likes: 3,
            location: Some(GeoPoint::new(48.1, 11.5).unwrap()),
            place: "Munich".into(),
            comments_quantity: 2,
        }
    }

    #[test]
    fn post_fields_use_client_names() {
        let fields = sample_post().to_fields().unwrap();
        assert_eq!(fields[fields::post::USER_ID], json!("alice"));
        assert_eq!(fields[fields::post::CREATED_DATE], json!(1_000));
        assert_eq!(fields[fields::post::LIKES], json!(3));
        assert_eq!(fields[fields::post::COMMENTS_QUANTITY], json!(2));
        assert_eq!(fields[fields::post::LOCATION]["latitude"], json!(48.1));
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn post_decodes_with_missing_optional_fields() {
        let fields = json!({ "userId": "bob", "createdDate": 5 });
        let post = Post::from_fields(PostId::new("p2").unwrap(), fields.as_object().unwrap())
            .unwrap();
        assert_eq!(post.user_id, uid("bob"));
        assert_eq!(post.likes, 0);
        assert_eq!(post.comments_quantity, 0);
        assert!(post.location.is_none());
    }

    #[test]
    fn post_counters_accept_whole_floats() {
        let fields = json!({ "userId": "bob", "createdDate": 5, "likes": 5.0, "commentsQuantity": 2 });
        let post = Post::from_fields(PostId::new("p2").unwrap(), fields.as_object().unwrap())
            .unwrap();
        assert_eq!(post.likes, 5);
        assert_eq!(post.comments_quantity, 2);
    }

    #[test]
    fn post_rejects_negative_or_fractional_counters() {
        for likes in [json!(-1), json!(2.5)] {
            let fields = json!({ "userId": "bob", "createdDate": 5, "likes": likes });
            let err = Post::from_fields(PostId::new("p2").unwrap(), fields.as_object().unwrap())
                .unwrap_err();
            assert!(err.to_string().contains("non-negative whole count"), "{err}");
        }
    }

    #[test]
    fn post_decode_error_names_document() {
        let fields = json!({ "userId": "bob", "createdDate": "yesterday" });
        let err = Post::from_fields(PostId::new("p3").unwrap(), fields.as_object().unwrap())
            .unwrap_err();
        match err {
            TypeError::Decode { kind, id, .. } => {
                assert_eq!(kind, "post");
                assert_eq!(id, "p3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn post_rejects_invalid_owner() {
        let fields = json!({ "userId": "", "createdDate": 5 });
        assert!(Post::from_fields(PostId::new("p4").unwrap(), fields.as_object().unwrap()).is_err());
    }

    #[test]
    fn comment_fields_use_client_names() {
        let comment = Comment {
            id: CommentId::new("c1").unwrap(),
            post_id: PostId::new("p1").unwrap(),
            author_id: uid("alice"),
            avatar: Some("https://store/userAvatars/a".into()),
            text: "nice".into(),
            created_date: Timestamp::from_millis(7),
        };
        let fields = comment.to_fields().unwrap();
        assert_eq!(fields[fields::comment::AUTHOR_ID], json!("alice"));
        assert_eq!(fields[fields::comment::TEXT], json!("nice"));
        assert_eq!(fields[fields::comment::AVATAR], json!("https://store/userAvatars/a"));

        let back = Comment::from_fields(comment.post_id.clone(), comment.id.clone(), &fields)
            .unwrap();
        assert_eq!(back, comment);
    }

    #[test]
    fn custom_avatar_detection() {
        let user = User::new(uid("u"), "login", "u@example.com");
        assert!(!user.has_custom_avatar());
        let user = user.with_avatar("https://store/userAvatars/default.jpg");
        assert!(!user.has_custom_avatar());
        let user = user.with_avatar("https://store/userAvatars/0192");
        assert!(user.has_custom_avatar());
    }

    #[test]
    fn user_profile_fields() {
        let user = User::new(uid("u"), "neo", "neo@example.com").with_avatar("https://a");
        let fields = user.to_fields().unwrap();
        assert_eq!(fields[fields::user::LOGIN], json!("neo"));
        assert_eq!(fields[fields::user::AVATAR], json!("https://a"));
    }
}
