//! EPUB text extraction: one block per `<p>` element of every XHTML document
//! listed in the package manifest.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use zip::ZipArchive;

use super::{TextBlocks, TextExtractor};
use crate::error::{IngestError, Result};

static CONTAINER_FULL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"full-path\s*=\s*["']([^"']+)["']"#).expect("valid regex"));

const DOCUMENT_MEDIA_TYPES: &[&str] = &["application/xhtml+xml", "text/html"];

#[derive(Debug, Default, Clone, Copy)]
pub struct EpubExtractor;

impl TextExtractor for EpubExtractor {
    fn extract<'a>(&'a self, path: &Path) -> Result<TextBlocks<'a>> {
        let file = File::open(path).map_err(|e| {
            IngestError::Extraction(format!("failed to open EPUB {}: {e}", path.display()))
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            IngestError::Extraction(format!("invalid EPUB ZIP {}: {e}", path.display()))
        })?;

        let container_xml = read_zip_entry_to_string(&mut archive, "META-INF/container.xml")?;
        let opf_path = parse_container_full_path(&container_xml)
            .or_else(|| {
                archive
                    .file_names()
                    .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
                    .map(ToOwned::to_owned)
            })
            .ok_or_else(|| {
                IngestError::Extraction("EPUB does not contain OPF package path".to_string())
            })?;

        let opf_xml = read_zip_entry_to_string(&mut archive, &opf_path)?;
        let documents = manifest_documents(&opf_xml, &opf_path)?;
        tracing::debug!(path = %path.display(), documents = documents.len(), "scanning EPUB");

        Ok(Box::new(EpubParagraphs {
            archive,
            documents: documents.into(),
            pending: VecDeque::new(),
            failed: false,
        }))
    }
}

/// Reads manifest documents one at a time as paragraphs are consumed.
struct EpubParagraphs {
    archive: ZipArchive<File>,
    documents: VecDeque<String>,
    pending: VecDeque<String>,
    failed: bool,
}

impl Iterator for EpubParagraphs {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(paragraph) = self.pending.pop_front() {
                return Some(Ok(paragraph));
            }
            if self.failed {
                return None;
            }
            let document = self.documents.pop_front()?;
            match read_zip_entry_to_string(&mut self.archive, &document)
                .and_then(|html| paragraphs(&html))
            {
                Ok(found) => self.pending.extend(found),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Package {
    manifest: Manifest,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "item", default)]
    items: Vec<ManifestItem>,
}

#[derive(Debug, Deserialize)]
struct ManifestItem {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@media-type")]
    media_type: String,
}

/// Archive paths of the content documents, in manifest order.
fn manifest_documents(opf_xml: &str, opf_path: &str) -> Result<Vec<String>> {
    let package: Package = quick_xml::de::from_str(opf_xml)
        .map_err(|e| IngestError::Extraction(format!("malformed OPF {opf_path}: {e}")))?;

    Ok(package
        .manifest
        .items
        .into_iter()
        .filter(|item| DOCUMENT_MEDIA_TYPES.contains(&item.media_type.as_str()))
        .map(|item| resolve_href(opf_path, &item.href))
        .collect())
}

/// Resolve a manifest href against the directory holding the OPF file.
fn resolve_href(opf_path: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or(href);
    let mut segments: Vec<&str> = opf_path.split('/').collect();
    segments.pop();
    for part in href.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn parse_container_full_path(container_xml: &str) -> Option<String> {
    CONTAINER_FULL_PATH
        .captures(container_xml)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn read_zip_entry_to_string(archive: &mut ZipArchive<File>, path: &str) -> Result<String> {
    let mut entry = archive
        .by_name(path)
        .map_err(|e| IngestError::Extraction(format!("missing EPUB entry {path}: {e}")))?;
    let mut buffer = String::new();
    entry
        .read_to_string(&mut buffer)
        .map_err(|e| IngestError::Extraction(format!("failed to read EPUB entry {path}: {e}")))?;
    Ok(buffer)
}

/// Plain text of every non-empty paragraph, markup stripped.
fn paragraphs(html: &str) -> Result<Vec<String>> {
    let selector = Selector::parse("p")
        .map_err(|e| IngestError::Extraction(format!("invalid paragraph selector: {e}")))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Fixture</dc:title>
  </metadata>
  <manifest>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="c1" href="text/chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="text/chapter2.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
    <itemref idref="c2"/>
  </spine>
</package>"#;

    fn xhtml(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><html xmlns=\"http://www.w3.org/1999/xhtml\"><body>{body}</body></html>"
        )
    }

    /// Writes a minimal EPUB whose second chapter carries `copyright_text`.
    pub(crate) fn write_epub(path: &Path, copyright_text: &str) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        zip.start_file("mimetype", options).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(CONTAINER.as_bytes()).unwrap();
        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(OPF.as_bytes()).unwrap();
        zip.start_file("OEBPS/style.css", options).unwrap();
        zip.write_all(b"p { margin: 0 }").unwrap();
        zip.start_file("OEBPS/text/chapter1.xhtml", options).unwrap();
        zip.write_all(xhtml("<h1>Title</h1><p>A <em>fine</em> book.</p><p>  </p>").as_bytes())
            .unwrap();
        zip.start_file("OEBPS/text/chapter2.xhtml", options).unwrap();
        zip.write_all(xhtml(&format!("<p>{copyright_text}</p><p>Dedication</p>")).as_bytes())
            .unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn yields_paragraphs_in_manifest_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fixture.epub");
        write_epub(&path, "ISBN 978-1-801-07736-1");

        let blocks: Vec<String> = EpubExtractor
            .extract(&path)
            .unwrap()
            .map(|b| b.unwrap())
            .collect();
        assert_eq!(
            blocks,
            vec!["A fine book.", "ISBN 978-1-801-07736-1", "Dedication"]
        );
    }

    #[test]
    fn corrupt_archive_is_an_extraction_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.epub");
        std::fs::write(&path, b"PK not really").unwrap();

        let err = EpubExtractor.extract(&path).err().unwrap();
        assert!(matches!(err, IngestError::Extraction(_)));
    }

    #[test]
    fn missing_document_surfaces_as_block_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.epub");
        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file("META-INF/container.xml", options).unwrap();
        zip.write_all(CONTAINER.as_bytes()).unwrap();
        zip.start_file("OEBPS/content.opf", options).unwrap();
        zip.write_all(OPF.as_bytes()).unwrap();
        zip.finish().unwrap();

        let mut blocks = EpubExtractor.extract(&path).unwrap();
        assert!(matches!(blocks.next(), Some(Err(IngestError::Extraction(_)))));
        assert!(blocks.next().is_none());
    }

    #[test]
    fn resolve_href_handles_relative_segments() {
        assert_eq!(resolve_href("OEBPS/content.opf", "text/c1.xhtml"), "OEBPS/text/c1.xhtml");
        assert_eq!(resolve_href("content.opf", "c1.xhtml#top"), "c1.xhtml");
        assert_eq!(resolve_href("OPS/pkg/content.opf", "../c1.xhtml"), "OPS/c1.xhtml");
    }
}
