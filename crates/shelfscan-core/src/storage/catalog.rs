use std::path::Path;

use rusqlite::{OptionalExtension, params};

use crate::models::{BookMetadata, BookRecord, join_publishers, split_publishers};

use super::database::{self, ConnectionPool, StoreError, StoreResult};

/// Persistent, deduplicated book storage keyed by ISBN-13.
///
/// `Ok(false)` from the store operations is the expected "already catalogued"
/// outcome, not a failure. `Err` always means the storage layer itself failed.
pub trait CatalogStore: Send + Sync {
    fn exists(&self, isbn13: &str) -> StoreResult<bool>;

    /// Insert a record with no metadata. Returns `false` if the ISBN is already present.
    fn store_bare(&self, isbn13: &str, path: &str) -> StoreResult<bool>;

    /// Insert a fully populated record. Never overwrites an existing one.
    fn store_enriched(&self, isbn13: &str, path: &str, metadata: &BookMetadata) -> StoreResult<bool>;

    /// Overwrite metadata of an existing record. Returns `false` if the ISBN is absent.
    fn update_metadata(&self, isbn13: &str, metadata: &BookMetadata) -> StoreResult<bool>;

    fn fetch(&self, isbn13: &str) -> StoreResult<Option<BookRecord>>;

    /// All records in insertion order.
    fn list_all(&self) -> StoreResult<Vec<BookRecord>>;

    /// Records still missing metadata, in insertion order.
    fn list_bare(&self) -> StoreResult<Vec<BookRecord>>;

    fn count(&self) -> StoreResult<usize>;
}

pub struct SqliteCatalog {
    pool: ConnectionPool,
}

impl SqliteCatalog {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let pool = database::open_database(path)?;
        Ok(Self { pool })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let pool = database::open_in_memory()?;
        Ok(Self { pool })
    }

    pub fn path(&self) -> Option<&str> {
        self.pool.path()
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<BookRecord> {
        let publishers: Option<String> = row.get(3)?;
        Ok(BookRecord {
            isbn13: row.get(0)?,
            source_path: row.get(1)?,
            title: row.get(2)?,
            publishers: publishers.as_deref().map(split_publishers),
            publish_date: row.get(4)?,
        })
    }

    fn insert(&self, isbn13: &str, path: &str, metadata: Option<&BookMetadata>) -> StoreResult<bool> {
        check_isbn13_shape(isbn13)?;
        let conn = self.pool.get_connection()?;
        let inserted = conn.execute(
            "INSERT INTO books (isbn, path, title, publishers, pubDate)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(isbn) DO NOTHING",
            params![
                isbn13,
                path,
                metadata.map(|m| m.title.as_str()),
                metadata.map(|m| join_publishers(&m.publishers)),
                metadata.map(|m| m.publish_date.as_str()),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn query_records(&self, sql: &str) -> StoreResult<Vec<BookRecord>> {
        let conn = self.pool.get_connection()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl CatalogStore for SqliteCatalog {
    fn exists(&self, isbn13: &str) -> StoreResult<bool> {
        let conn = self.pool.get_connection()?;
        let found = conn
            .prepare("SELECT 1 FROM books WHERE isbn = ?1")?
            .exists(params![isbn13])?;
        Ok(found)
    }

    fn store_bare(&self, isbn13: &str, path: &str) -> StoreResult<bool> {
        self.insert(isbn13, path, None)
    }

    fn store_enriched(&self, isbn13: &str, path: &str, metadata: &BookMetadata) -> StoreResult<bool> {
        self.insert(isbn13, path, Some(metadata))
    }

    fn update_metadata(&self, isbn13: &str, metadata: &BookMetadata) -> StoreResult<bool> {
        let conn = self.pool.get_connection()?;
        let updated = conn.execute(
            "UPDATE books SET title = ?2, publishers = ?3, pubDate = ?4 WHERE isbn = ?1",
            params![
                isbn13,
                metadata.title,
                join_publishers(&metadata.publishers),
                metadata.publish_date,
            ],
        )?;
        Ok(updated > 0)
    }

    fn fetch(&self, isbn13: &str) -> StoreResult<Option<BookRecord>> {
        let conn = self.pool.get_connection()?;
        let record = conn
            .query_row(
                "SELECT isbn, path, title, publishers, pubDate FROM books WHERE isbn = ?1",
                params![isbn13],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn list_all(&self) -> StoreResult<Vec<BookRecord>> {
        self.query_records("SELECT isbn, path, title, publishers, pubDate FROM books ORDER BY id")
    }

    fn list_bare(&self) -> StoreResult<Vec<BookRecord>> {
        self.query_records(
            "SELECT isbn, path, title, publishers, pubDate FROM books
             WHERE title IS NULL OR publishers IS NULL OR pubDate IS NULL
             ORDER BY id",
        )
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.pool.get_connection()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Checksums are the normalizer's job; the catalog only refuses obviously malformed keys.
fn check_isbn13_shape(isbn13: &str) -> StoreResult<()> {
    if isbn13.len() == 13 && isbn13.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(StoreError::InvalidRecord(format!("not an ISBN-13: {isbn13:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_metadata() -> BookMetadata {
        BookMetadata::new(
            "Rust for Rustaceans",
            vec!["No Starch Press".to_string(), "Penguin Random House".to_string()],
            "December 2021",
        )
    }

    #[test]
    fn store_bare_twice_keeps_one_record() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        assert!(catalog.store_bare("9780306406157", "/books/a.pdf").unwrap());
        assert!(!catalog.store_bare("9780306406157", "/books/b.pdf").unwrap());

        assert_eq!(catalog.count().unwrap(), 1);
        let record = catalog.fetch("9780306406157").unwrap().unwrap();
        assert_eq!(record.source_path, "/books/a.pdf");
        assert!(!record.is_enriched());
    }

    #[test]
    fn store_enriched_then_fetch_returns_exact_fields() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let meta = sample_metadata();
        assert!(catalog.store_enriched("9781718501850", "rfr.epub", &meta).unwrap());

        let record = catalog.fetch("9781718501850").unwrap().unwrap();
        assert_eq!(record, BookRecord::enriched("9781718501850", "rfr.epub", meta));
    }

    #[test]
    fn publisher_names_come_back_exactly_as_stored() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let meta = BookMetadata::new(
            "Rust Web Programming",
            vec![" Packt ".to_string(), "".to_string(), "O'Reilly".to_string()],
            "2021",
        );
        catalog.store_enriched("9781801077361", "rwp.pdf", &meta).unwrap();

        let record = catalog.fetch("9781801077361").unwrap().unwrap();
        assert_eq!(record.metadata(), Some(meta));
    }

    #[test]
    fn store_enriched_does_not_overwrite_existing() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.store_bare("9781718501850", "first.pdf").unwrap();
        assert!(!catalog.store_enriched("9781718501850", "second.pdf", &sample_metadata()).unwrap());

        let record = catalog.fetch("9781718501850").unwrap().unwrap();
        assert_eq!(record.source_path, "first.pdf");
        assert!(record.title.is_none());
    }

    #[test]
    fn update_metadata_upgrades_bare_record_in_place() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.store_bare("9781718501850", "rfr.pdf").unwrap();
        assert!(catalog.update_metadata("9781718501850", &sample_metadata()).unwrap());

        let record = catalog.fetch("9781718501850").unwrap().unwrap();
        assert!(record.is_enriched());
        assert_eq!(record.source_path, "rfr.pdf");
        assert_eq!(catalog.count().unwrap(), 1);
    }

    #[test]
    fn update_metadata_on_missing_isbn_returns_false() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        assert!(!catalog.update_metadata("9781718501850", &sample_metadata()).unwrap());
        assert!(!catalog.exists("9781718501850").unwrap());
    }

    #[test]
    fn list_all_preserves_insertion_order() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        catalog.store_bare("9780306406157", "a").unwrap();
        catalog.store_enriched("9781718501850", "b", &sample_metadata()).unwrap();
        catalog.store_bare("9780131103627", "c").unwrap();

        let isbns: Vec<_> = catalog
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.isbn13)
            .collect();
        assert_eq!(isbns, vec!["9780306406157", "9781718501850", "9780131103627"]);

        let bare: Vec<_> = catalog.list_bare().unwrap().into_iter().map(|r| r.isbn13).collect();
        assert_eq!(bare, vec!["9780306406157", "9780131103627"]);
    }

    #[test]
    fn malformed_isbn_is_rejected() {
        let catalog = SqliteCatalog::open_in_memory().unwrap();
        let err = catalog.store_bare("030640615X", "a").unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(catalog.count().unwrap(), 0);
    }

    #[test]
    fn catalog_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("catalog.db");
        {
            let catalog = SqliteCatalog::open(&path).unwrap();
            catalog.store_bare("9780306406157", "a.pdf").unwrap();
        }
        let catalog = SqliteCatalog::open(&path).unwrap();
        assert!(catalog.exists("9780306406157").unwrap());
        assert_eq!(catalog.path(), Some(path.to_string_lossy().as_ref()));
    }
}
