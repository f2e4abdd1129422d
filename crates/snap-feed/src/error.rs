use thiserror::Error;

use snap_types::PostId;

use crate::fanout::FanoutReport;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("object store error: {0}")]
    Blob(#[from] snap_blob::BlobError),

    #[error("document store error: {0}")]
    Doc(#[from] snap_docs::DocError),

    #[error("invalid data: {0}")]
    Type(#[from] snap_types::TypeError),

    #[error("cannot read image: {0}")]
    Image(#[from] std::io::Error),

    #[error("image is empty")]
    EmptyImage,

    #[error(
        "avatar fan-out incomplete: {} of {} comments not updated",
        .0.failed.len(),
        .0.matched
    )]
    FanoutIncomplete(FanoutReport),

    #[error("no signed-in user")]
    NotSignedIn,

    #[error("post not found: {0}")]
    PostNotFound(PostId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
