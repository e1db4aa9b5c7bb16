use std::sync::Arc;

use serde::Serialize;
use shelfscan_core::{CatalogStore, StoreError};

use crate::sources::MetadataResolver;

/// What a catalogue attempt did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOutcome {
    Enriched,
    Bare,
    AlreadyCatalogued,
}

impl StoreOutcome {
    pub fn is_new(self) -> bool {
        !matches!(self, Self::AlreadyCatalogued)
    }
}

/// The resolve-then-store step shared by the batch and capture pipelines.
#[derive(Clone)]
pub struct Cataloguer {
    resolver: Arc<dyn MetadataResolver>,
    store: Arc<dyn CatalogStore>,
}

impl Cataloguer {
    pub fn new(resolver: Arc<dyn MetadataResolver>, store: Arc<dyn CatalogStore>) -> Self {
        Self { resolver, store }
    }

    /// Resolves metadata for `isbn13` and stores it, bare when the resolver
    /// has nothing. An existing record is never overwritten.
    pub async fn catalogue(&self, isbn13: &str, source: &str) -> Result<StoreOutcome, StoreError> {
        let metadata = self.resolver.resolve(isbn13).await;

        let (inserted, kind) = match &metadata {
            Some(meta) => (
                self.store.store_enriched(isbn13, source, meta)?,
                StoreOutcome::Enriched,
            ),
            None => (self.store.store_bare(isbn13, source)?, StoreOutcome::Bare),
        };

        if !inserted {
            tracing::debug!(isbn = isbn13, "already catalogued");
            return Ok(StoreOutcome::AlreadyCatalogued);
        }
        match &metadata {
            Some(meta) => tracing::info!(isbn = isbn13, title = %meta.title, "catalogued"),
            None => tracing::info!(isbn = isbn13, "catalogued without metadata"),
        }
        Ok(kind)
    }
}
