pub mod config;
pub mod discover;
pub mod error;
pub mod models;
pub mod storage;

pub use config::AppConfig;
pub use error::{CoreError, Result, StoreError};
pub use models::*;

pub use storage::database::{ConnectionPool, StoreResult, open_database, open_in_memory};
pub use storage::{CatalogStore, SqliteCatalog};
