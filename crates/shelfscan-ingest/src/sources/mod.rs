use async_trait::async_trait;
use shelfscan_core::BookMetadata;

pub mod openlibrary;

pub use openlibrary::OpenLibrarySource;

/// Maps a validated ISBN-13 to bibliographic metadata.
///
/// Implementations never fail outward: any provider problem is logged and
/// reported as `None`, which callers treat as "proceed without metadata".
#[async_trait]
pub trait MetadataResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, isbn13: &str) -> Option<BookMetadata>;
}

/// Resolver used when metadata lookups are disabled; every book is stored bare.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMetadata;

#[async_trait]
impl MetadataResolver for NoMetadata {
    fn name(&self) -> &str {
        "none"
    }

    async fn resolve(&self, _isbn13: &str) -> Option<BookMetadata> {
        None
    }
}
