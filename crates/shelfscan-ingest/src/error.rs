use shelfscan_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("invalid ISBN: {0}")]
    InvalidIsbn(String),

    #[error("metadata provider unavailable: {0}")]
    ResolverUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limit from {0}, retry after {1}s")]
    RateLimit(String, u64),

    #[error("catalog error: {0}")]
    Store(#[from] StoreError),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
