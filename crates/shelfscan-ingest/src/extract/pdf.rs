//! PDF text extraction by rasterizing pages and running OCR on each one.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use lopdf::Document;
use tempfile::TempDir;

use super::{TextBlocks, TextExtractor};
use crate::error::{IngestError, Result};

const DEFAULT_MAX_PAGES: u32 = 10;
const DEFAULT_DPI: u32 = 200;

/// Renders one PDF page (1-based) to PNG bytes.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<Vec<u8>>;
}

/// Maps a raster image to the text it contains.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, png: &[u8]) -> Result<String>;
}

pub struct PdfOcrExtractor {
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    max_pages: u32,
    dpi: u32,
}

impl PdfOcrExtractor {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            rasterizer,
            ocr,
            max_pages: DEFAULT_MAX_PAGES,
            dpi: DEFAULT_DPI,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    fn ocr_page(&self, pdf_path: &Path, page: u32) -> Result<String> {
        let png = self.rasterizer.rasterize(pdf_path, page, self.dpi)?;
        self.ocr.recognize(&png)
    }
}

impl TextExtractor for PdfOcrExtractor {
    fn extract<'a>(&'a self, path: &Path) -> Result<TextBlocks<'a>> {
        let pages = page_count(path)?.min(self.max_pages);
        let pdf_path = path.to_path_buf();
        tracing::debug!(path = %pdf_path.display(), pages, "OCR scanning PDF");
        Ok(Box::new(
            (1..=pages).map(move |page| self.ocr_page(&pdf_path, page)),
        ))
    }
}

fn page_count(pdf_path: &Path) -> Result<u32> {
    let document = Document::load(pdf_path).map_err(|e| {
        IngestError::Extraction(format!("failed to open PDF {}: {e}", pdf_path.display()))
    })?;
    Ok(document.get_pages().len() as u32)
}

fn command_error(program: &str, err: std::io::Error) -> IngestError {
    if err.kind() == std::io::ErrorKind::NotFound {
        IngestError::Extraction(format!("{program} is not installed"))
    } else {
        IngestError::Extraction(format!("failed to run {program}: {err}"))
    }
}

// ─── pdftoppm ────────────────────────────────────────────────────────────────

pub struct PdftoppmRasterizer {
    command: String,
}

impl PdftoppmRasterizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into() }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<Vec<u8>> {
        let temp_dir = TempDir::new()?;
        let output_prefix: PathBuf = temp_dir.path().join("page");
        let page_str = page.to_string();

        let output = Command::new(&self.command)
            .args(["-png", "-singlefile", "-r", &dpi.to_string()])
            .args(["-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg(&output_prefix)
            .output()
            .map_err(|e| command_error(&self.command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(IngestError::Extraction(format!(
                "{} failed on page {page} of {}: {stderr}",
                self.command,
                pdf_path.display()
            )));
        }

        let image = output_prefix.with_extension("png");
        std::fs::read(&image).map_err(|e| {
            IngestError::Extraction(format!("no image generated for page {page}: {e}"))
        })
    }
}

// ─── tesseract ───────────────────────────────────────────────────────────────

pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, png: &[u8]) -> Result<String> {
        let mut image = tempfile::Builder::new().suffix(".png").tempfile()?;
        image.write_all(png)?;
        image.flush()?;

        let output = Command::new(&self.command)
            .arg(image.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .map_err(|e| command_error(&self.command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(IngestError::Extraction(format!("{} failed: {stderr}", self.command)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
