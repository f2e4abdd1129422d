use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("no signed-in user")]
    NotSignedIn,

    #[error(transparent)]
    Feed(#[from] snap_feed::FeedError),

    #[error("object store error: {0}")]
    Blob(#[from] snap_blob::BlobError),

    #[error("document store error: {0}")]
    Doc(#[from] snap_docs::DocError),
}

pub type SdkResult<T> = Result<T, SdkError>;
