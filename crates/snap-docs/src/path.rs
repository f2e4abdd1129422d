//! Collection and document paths.
//!
//! Paths alternate collection ids and document ids, starting with a
//! collection: `posts` is a collection, `posts/p1` a document,
//! `posts/p1/comments` a sub-collection, and `posts/p1/comments/c1` a
//! document inside it. Collection paths therefore have an odd number of
//! segments and document paths an even number.

use std::fmt;

use crate::error::{DocError, DocResult};

fn split_segments(path: &str) -> DocResult<Vec<&str>> {
    let invalid = |reason| DocError::InvalidPath {
        path: path.to_string(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("must not be empty"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(invalid("must not contain empty segments"));
        }
        if *segment == "." || *segment == ".." {
            return Err(invalid("must not contain '.' or '..' segments"));
        }
        if segment.trim() != *segment {
            return Err(invalid("segments must not have surrounding whitespace"));
        }
    }
    Ok(segments)
}

fn validate_segment(segment: &str) -> DocResult<()> {
    if segment.contains('/') {
        return Err(DocError::InvalidPath {
            path: segment.to_string(),
            reason: "a single segment must not contain '/'",
        });
    }
    split_segments(segment).map(|_| ())
}

/// Path of a collection: `posts` or `posts/{postId}/comments`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Parse a collection path.
    ///
    /// ```
    /// use snap_docs::CollectionPath;
    ///
    /// assert!(CollectionPath::parse("posts").is_ok());
    /// assert!(CollectionPath::parse("posts/p1/comments").is_ok());
    /// assert!(CollectionPath::parse("posts/p1").is_err());
    /// ```
    pub fn parse(path: impl AsRef<str>) -> DocResult<Self> {
        let path = path.as_ref();
        let segments = split_segments(path)?;
        if segments.len() % 2 == 0 {
            return Err(DocError::InvalidPath {
                path: path.to_string(),
                reason: "collection paths have an odd number of segments",
            });
        }
        Ok(Self(path.to_string()))
    }

    /// The document with id `id` inside this collection.
    pub fn doc(&self, id: &str) -> DocResult<DocumentPath> {
        validate_segment(id)?;
        Ok(DocumentPath(format!("{}/{id}", self.0)))
    }

    /// The last segment, shared by every collection of the same group.
    pub fn collection_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The document owning this sub-collection, if any.
    pub fn parent(&self) -> Option<DocumentPath> {
        let (parent, _) = self.0.rsplit_once('/')?;
        Some(DocumentPath(parent.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionPath({})", self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a document: `posts/{postId}` or `posts/{postId}/comments/{id}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a document path.
    pub fn parse(path: impl AsRef<str>) -> DocResult<Self> {
        let path = path.as_ref();
        let segments = split_segments(path)?;
        if segments.len() % 2 != 0 {
            return Err(DocError::InvalidPath {
                path: path.to_string(),
                reason: "document paths have an even number of segments",
            });
        }
        Ok(Self(path.to_string()))
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(self.0.clone()),
        }
    }

    /// Id of the containing collection, used to match group queries.
    pub fn collection_id(&self) -> &str {
        let mut segments = self.0.rsplit('/');
        segments.next();
        segments.next().unwrap_or_default()
    }

    /// A sub-collection owned by this document.
    pub fn collection(&self, id: &str) -> DocResult<CollectionPath> {
        validate_segment(id)?;
        Ok(CollectionPath(format!("{}/{id}", self.0)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({})", self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for DocumentPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_paths() {
        let posts = CollectionPath::parse("posts").unwrap();
        let post = posts.doc("p1").unwrap();
        assert_eq!(post.as_str(), "posts/p1");
        assert_eq!(post.id(), "p1");
        assert_eq!(post.collection_id(), "posts");

        let comments = post.collection("comments").unwrap();
        assert_eq!(comments.as_str(), "posts/p1/comments");
        assert_eq!(comments.collection_id(), "comments");
        assert_eq!(comments.parent().unwrap(), post);

        let comment = comments.doc("c1").unwrap();
        assert_eq!(comment.collection_id(), "comments");
        assert_eq!(comment.parent(), comments);
    }

    #[test]
    fn root_collection_has_no_parent() {
        assert!(CollectionPath::parse("posts").unwrap().parent().is_none());
    }

    #[test]
    fn segment_parity_enforced() {
        assert!(DocumentPath::parse("posts").is_err());
        assert!(DocumentPath::parse("posts/p1/comments").is_err());
        assert!(DocumentPath::parse("posts/p1/comments/c1").is_ok());
        assert!(CollectionPath::parse("posts/p1").is_err());
    }

    #[test]
    fn malformed_paths_rejected() {
        for p in ["", "/posts", "posts/", "posts//p1", "posts/../x", "posts/ p1"] {
            assert!(DocumentPath::parse(p).is_err(), "{p:?} should be invalid");
        }
    }

    #[test]
    fn child_segments_validated() {
        let posts = CollectionPath::parse("posts").unwrap();
        assert!(posts.doc("a/b").is_err());
        assert!(posts.doc("").is_err());
        assert!(posts.doc("ok").unwrap().collection("x/y").is_err());
    }

    #[test]
    fn document_path_serializes_as_string() {
        let path = DocumentPath::parse("posts/p1/comments/c1").unwrap();
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            "\"posts/p1/comments/c1\""
        );
    }
}
