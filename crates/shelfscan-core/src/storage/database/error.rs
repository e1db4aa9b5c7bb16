use thiserror::Error;

/// Storage-layer failure during a catalog read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog connection lock poisoned")]
    Poisoned,

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
