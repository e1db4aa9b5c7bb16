//! Text extraction strategies, one per supported document format.
//!
//! Every extractor yields a lazy, finite sequence of text blocks. Blocks are
//! produced on demand so a caller that stops at the first ISBN never pays for
//! the rest of the document.

pub mod epub;
pub mod pdf;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use shelfscan_core::config::ExtractionConfig;

use crate::error::Result;

pub use epub::EpubExtractor;
pub use pdf::{OcrEngine, PageRasterizer, PdfOcrExtractor, PdftoppmRasterizer, TesseractOcr};

/// Lazy sequence of text blocks. A block error ends extraction for that file.
pub type TextBlocks<'a> = Box<dyn Iterator<Item = Result<String>> + 'a>;

pub trait TextExtractor: Send + Sync {
    /// Open `path` and return its text blocks. Fails with
    /// [`IngestError::Extraction`](crate::IngestError::Extraction) if the file
    /// cannot be opened or parsed.
    fn extract<'a>(&'a self, path: &Path) -> Result<TextBlocks<'a>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Epub,
    Unsupported,
}

impl DocumentFormat {
    pub fn detect(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Self::Pdf,
            "epub" => Self::Epub,
            _ => Self::Unsupported,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Epub => "EPUB",
            Self::Unsupported => "unsupported",
        }
    }
}

/// The extractor strategy for each supported format.
#[derive(Clone)]
pub struct ExtractorSet {
    pdf: Arc<dyn TextExtractor>,
    epub: Arc<dyn TextExtractor>,
}

impl ExtractorSet {
    pub fn new(pdf: Arc<dyn TextExtractor>, epub: Arc<dyn TextExtractor>) -> Self {
        Self { pdf, epub }
    }

    /// OCR through the configured `pdftoppm` / `tesseract` binaries, EPUB parsed in-process.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let rasterizer = Arc::new(PdftoppmRasterizer::new(&config.pdftoppm_command));
        let ocr = Arc::new(TesseractOcr::new(&config.tesseract_command, &config.ocr_language));
        let pdf = PdfOcrExtractor::new(rasterizer, ocr)
            .with_max_pages(config.max_pdf_pages)
            .with_dpi(config.dpi);
        Self::new(Arc::new(pdf), Arc::new(EpubExtractor))
    }

    pub fn for_format(&self, format: DocumentFormat) -> Option<&dyn TextExtractor> {
        match format {
            DocumentFormat::Pdf => Some(self.pdf.as_ref()),
            DocumentFormat::Epub => Some(self.epub.as_ref()),
            DocumentFormat::Unsupported => None,
        }
    }
}
