mod connection;
mod error;
mod schema;

pub use connection::ConnectionPool;
pub use error::{StoreError, StoreResult};
pub use schema::init_schema;

use std::path::Path;

/// Open (creating if needed) the catalog database at `path` and ensure the schema exists.
pub fn open_database(path: &Path) -> StoreResult<ConnectionPool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let pool = ConnectionPool::open(path)?;
    {
        let conn = pool.get_connection()?;
        init_schema(&conn)?;
    }
    Ok(pool)
}

pub fn open_in_memory() -> StoreResult<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get_connection()?;
        init_schema(&conn)?;
    }
    Ok(pool)
}
