use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use super::error::{StoreError, StoreResult};
use super::schema::apply_pragmas;

/// Single shared connection. Holding the guard serializes catalog access.
pub struct ConnectionPool {
    path: Option<String>,
    connection: Mutex<Connection>,
}

impl ConnectionPool {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path: Some(path.to_string_lossy().to_string()),
            connection: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        Ok(Self {
            path: None,
            connection: Mutex::new(conn),
        })
    }

    pub fn get_connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}
