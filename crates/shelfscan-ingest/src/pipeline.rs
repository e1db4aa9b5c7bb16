//! Batch cataloguing of book files.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalogue::{Cataloguer, StoreOutcome};
use crate::error::IngestError;
use crate::extract::{DocumentFormat, ExtractorSet, TextExtractor};
use crate::identifiers::{Isbn, find_isbn_in_text};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FormatCounts {
    pub attempted: usize,
    pub succeeded: usize,
}

/// Counters for one batch run. A format "succeeded" when a valid ISBN was found.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub files_seen: usize,
    pub skipped: usize,
    pub pdf: FormatCounts,
    pub epub: FormatCounts,
    pub extraction_failures: usize,
    pub no_isbn: usize,
    pub store_failures: usize,
    pub stored: usize,
    pub duplicates: usize,
}

impl RunSummary {
    fn started() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            files_seen: 0,
            skipped: 0,
            pdf: FormatCounts::default(),
            epub: FormatCounts::default(),
            extraction_failures: 0,
            no_isbn: 0,
            store_failures: 0,
            stored: 0,
            duplicates: 0,
        }
    }

    fn counts_mut(&mut self, format: DocumentFormat) -> Option<&mut FormatCounts> {
        match format {
            DocumentFormat::Pdf => Some(&mut self.pdf),
            DocumentFormat::Epub => Some(&mut self.epub),
            DocumentFormat::Unsupported => None,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Files seen: {} ({} skipped)", self.files_seen, self.skipped)?;
        writeln!(f, "Parsed PDFs: {} out of {}", self.pdf.succeeded, self.pdf.attempted)?;
        writeln!(f, "Parsed EPUBs: {} out of {}", self.epub.succeeded, self.epub.attempted)?;
        writeln!(
            f,
            "New records: {}, already catalogued: {}",
            self.stored, self.duplicates
        )?;
        write!(
            f,
            "Failures: {} extraction, {} without ISBN, {} storage",
            self.extraction_failures, self.no_isbn, self.store_failures
        )
    }
}

/// Every ISBN validated during the run, in file order, plus the counters.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub isbns: Vec<String>,
    pub summary: RunSummary,
}

enum FileScan {
    Found(Isbn),
    NoIsbn,
    Failed(IngestError),
}

pub struct BatchPipeline {
    extractors: ExtractorSet,
    cataloguer: Cataloguer,
}

impl BatchPipeline {
    pub fn new(extractors: ExtractorSet, cataloguer: Cataloguer) -> Self {
        Self {
            extractors,
            cataloguer,
        }
    }

    /// Processes `paths` in order. A failing file is logged and counted; it
    /// never stops the run.
    pub async fn run(&self, paths: &[PathBuf]) -> BatchOutcome {
        let mut summary = RunSummary::started();
        let mut isbns = Vec::new();

        for path in paths {
            summary.files_seen += 1;
            let format = DocumentFormat::detect(path);
            let Some(extractor) = self.extractors.for_format(format) else {
                tracing::debug!(path = %path.display(), "skipping unsupported file");
                summary.skipped += 1;
                continue;
            };
            if let Some(counts) = summary.counts_mut(format) {
                counts.attempted += 1;
            }

            let isbn = match scan_file(extractor, path) {
                FileScan::Found(isbn) => isbn,
                FileScan::NoIsbn => {
                    tracing::error!(path = %path.display(), "no valid ISBN found");
                    summary.no_isbn += 1;
                    continue;
                }
                FileScan::Failed(err) => {
                    tracing::error!(path = %path.display(), "{} extraction failed: {err}", format.label());
                    summary.extraction_failures += 1;
                    continue;
                }
            };
            if let Some(counts) = summary.counts_mut(format) {
                counts.succeeded += 1;
            }

            let source = path.to_string_lossy();
            match self.cataloguer.catalogue(&isbn.isbn13, &source).await {
                Ok(StoreOutcome::AlreadyCatalogued) => summary.duplicates += 1,
                Ok(_) => summary.stored += 1,
                Err(err) => {
                    tracing::error!(path = %path.display(), isbn = %isbn, "failed to store: {err}");
                    summary.store_failures += 1;
                }
            }
            isbns.push(isbn.isbn13);
        }

        summary.finished_at = Utc::now();
        tracing::info!(
            files = summary.files_seen,
            stored = summary.stored,
            duplicates = summary.duplicates,
            "batch run finished"
        );
        BatchOutcome { isbns, summary }
    }
}

/// Walks the file's blocks until one yields a valid ISBN. Kept synchronous so
/// the block iterator never lives across an await.
fn scan_file(extractor: &dyn TextExtractor, path: &Path) -> FileScan {
    let blocks = match extractor.extract(path) {
        Ok(blocks) => blocks,
        Err(err) => return FileScan::Failed(err),
    };
    for (index, block) in blocks.enumerate() {
        match block {
            Ok(text) => {
                if let Some(isbn) = find_isbn_in_text(&text) {
                    tracing::debug!(path = %path.display(), block = index, isbn = %isbn, "ISBN found");
                    return FileScan::Found(isbn);
                }
            }
            Err(err) => return FileScan::Failed(err),
        }
    }
    FileScan::NoIsbn
}
