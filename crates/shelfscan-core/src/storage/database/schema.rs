use rusqlite::Connection;

use super::error::StoreResult;

pub fn apply_pragmas(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS books (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            isbn       TEXT NOT NULL,
            path       TEXT NOT NULL,
            title      TEXT,
            publishers TEXT,
            pubDate    TEXT
        );
        ",
    )?;
    Ok(())
}

/// The unique index is what makes insert-if-absent a single atomic statement.
pub fn create_indexes(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE UNIQUE INDEX IF NOT EXISTS idx_books_isbn ON books(isbn);
        ",
    )?;
    Ok(())
}

pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    create_tables(conn)?;
    create_indexes(conn)?;
    Ok(())
}
