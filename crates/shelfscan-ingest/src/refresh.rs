//! Second-pass enrichment of records that were stored without metadata.

use serde::Serialize;
use shelfscan_core::{CatalogStore, StoreError};

use crate::sources::MetadataResolver;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub checked: usize,
    pub enriched: usize,
    pub unresolved: usize,
    pub failed: usize,
}

/// Resolves every bare record again and upgrades it in place when the
/// resolver now has metadata. Fails only if the bare records cannot be listed.
pub async fn refresh_bare_records(
    resolver: &dyn MetadataResolver,
    store: &dyn CatalogStore,
) -> Result<RefreshSummary, StoreError> {
    let mut summary = RefreshSummary::default();

    for record in store.list_bare()? {
        summary.checked += 1;
        let Some(metadata) = resolver.resolve(&record.isbn13).await else {
            summary.unresolved += 1;
            continue;
        };
        match store.update_metadata(&record.isbn13, &metadata) {
            Ok(true) => {
                tracing::info!(isbn = %record.isbn13, title = %metadata.title, "enriched");
                summary.enriched += 1;
            }
            Ok(false) => {
                tracing::warn!(isbn = %record.isbn13, "record vanished before update");
                summary.failed += 1;
            }
            Err(err) => {
                tracing::error!(isbn = %record.isbn13, "failed to update metadata: {err}");
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use shelfscan_core::SqliteCatalog;

    use super::*;
    use crate::catalogue::tests::{RecordingResolver, sample_metadata};

    #[tokio::test]
    async fn upgrades_only_resolvable_bare_records() {
        let store = SqliteCatalog::open_in_memory().unwrap();
        store.store_bare("9781801077361", "rwp.pdf").unwrap();
        store.store_bare("9780306406157", "other.pdf").unwrap();
        store
            .store_enriched("9780131103627", "kr.epub", &sample_metadata())
            .unwrap();

        let resolver = RecordingResolver::knowing("9781801077361", sample_metadata());
        let summary = refresh_bare_records(&resolver, &store).await.unwrap();

        assert_eq!(
            summary,
            RefreshSummary { checked: 2, enriched: 1, unresolved: 1, failed: 0 }
        );
        assert_eq!(resolver.calls(), vec!["9781801077361", "9780306406157"]);

        let upgraded = store.fetch("9781801077361").unwrap().unwrap();
        assert!(upgraded.is_enriched());
        assert_eq!(upgraded.source_path, "rwp.pdf");
        assert_eq!(store.list_bare().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_catalog_checks_nothing() {
        let store = SqliteCatalog::open_in_memory().unwrap();
        let resolver = RecordingResolver::default();
        let summary = refresh_bare_records(&resolver, &store).await.unwrap();
        assert_eq!(summary, RefreshSummary::default());
        assert!(resolver.calls().is_empty());
    }
}
