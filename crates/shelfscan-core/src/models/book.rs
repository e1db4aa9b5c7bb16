use serde::{Deserialize, Serialize};

/// Separator used when a publisher list is flattened into one column.
pub const PUBLISHER_SEPARATOR: &str = ";";

// ─── BookRecord ─────────────────────────────────────────────

/// One catalog entry, keyed by its ISBN-13.
///
/// A record is either bare (isbn + source path) or enriched (all metadata
/// fields populated). Enrichment upgrades a bare record in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub isbn13: String,
    pub source_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishers: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
}

impl BookRecord {
    pub fn bare(isbn13: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            isbn13: isbn13.into(),
            source_path: source_path.into(),
            title: None,
            publishers: None,
            publish_date: None,
        }
    }

    pub fn enriched(
        isbn13: impl Into<String>,
        source_path: impl Into<String>,
        metadata: BookMetadata,
    ) -> Self {
        Self {
            isbn13: isbn13.into(),
            source_path: source_path.into(),
            title: Some(metadata.title),
            publishers: Some(metadata.publishers),
            publish_date: Some(metadata.publish_date),
        }
    }

    /// True when every metadata column is populated.
    pub fn is_enriched(&self) -> bool {
        self.title.is_some() && self.publishers.is_some() && self.publish_date.is_some()
    }

    pub fn metadata(&self) -> Option<BookMetadata> {
        Some(BookMetadata {
            title: self.title.clone()?,
            publishers: self.publishers.clone()?,
            publish_date: self.publish_date.clone()?,
        })
    }

    /// Title for listings; bare records show an empty string.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

// ─── Metadata ───────────────────────────────────────────────

/// Bibliographic metadata resolved for an ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    /// Publisher names in provider order, duplicates kept.
    pub publishers: Vec<String>,
    /// Free-form, as supplied by the provider.
    pub publish_date: String,
}

impl BookMetadata {
    pub fn new(
        title: impl Into<String>,
        publishers: Vec<String>,
        publish_date: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            publishers,
            publish_date: publish_date.into(),
        }
    }

    pub fn publishers_display(&self) -> String {
        join_publishers(&self.publishers)
    }
}

pub fn join_publishers(publishers: &[String]) -> String {
    publishers.join(PUBLISHER_SEPARATOR)
}

/// Inverse of [`join_publishers`]. Names come back byte for byte; only the
/// empty column maps to an empty list.
pub fn split_publishers(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined
        .split(PUBLISHER_SEPARATOR)
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_record_has_no_metadata() {
        let record = BookRecord::bare("9780306406157", "/books/a.pdf");
        assert!(!record.is_enriched());
        assert!(record.metadata().is_none());
        assert_eq!(record.display_title(), "");
    }

    #[test]
    fn enriched_record_roundtrips_metadata() {
        let meta = BookMetadata::new(
            "The C Programming Language",
            vec!["Prentice Hall".to_string(), "Prentice Hall".to_string()],
            "1988",
        );
        let record = BookRecord::enriched("9780131103627", "kr.epub", meta.clone());
        assert!(record.is_enriched());
        assert_eq!(record.metadata(), Some(meta));
    }

    #[test]
    fn publishers_join_keeps_order_and_duplicates() {
        let names = vec!["O'Reilly".to_string(), "Packt".to_string(), "O'Reilly".to_string()];
        assert_eq!(join_publishers(&names), "O'Reilly;Packt;O'Reilly");
        assert_eq!(split_publishers("O'Reilly;Packt;O'Reilly"), names);
    }

    #[test]
    fn split_publishers_keeps_names_verbatim() {
        assert_eq!(split_publishers(" Packt ;;O'Reilly"), vec![" Packt ", "", "O'Reilly"]);
        assert_eq!(split_publishers("Addison-Wesley;"), vec!["Addison-Wesley", ""]);
        assert!(split_publishers("").is_empty());
    }
}
