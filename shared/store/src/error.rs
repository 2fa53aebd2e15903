/// Errors raised by durable storage, the stores built on top of it, and the
/// remote mirror.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("corrupt value under `{key}`: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("encryption failure: {0}")]
    Crypto(String),
    #[error("remote sync failed: {0}")]
    Remote(String),
    #[error("collection `{0}` has not been loaded")]
    NotLoaded(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
