//! Text extraction from uploaded PDF and DOCX files.
//!
//! PDFs are read page by page with [`lopdf`]; a page whose text cannot be
//! extracted contributes an empty string instead of failing the document.
//! DOCX files are ZIP containers whose `word/document.xml` part is streamed
//! with [`quick_xml`]; the whole document becomes a single page.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::document::PageText;
use crate::error::{RagError, Result};

/// A supported upload format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word-processing document.
    Docx,
}

impl DocumentFormat {
    /// Resolve the format from a file name, ignoring extension case.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::UnsupportedFormat`] for any other extension.
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("docx") => Ok(Self::Docx),
            _ => Err(RagError::UnsupportedFormat { filename: filename.to_string() }),
        }
    }
}

/// Converts uploaded files into per-page text records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentReader;

impl DocumentReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }

    /// Read a document from disk.
    ///
    /// The format is checked before the file is opened, so an unsupported
    /// extension never touches the filesystem.
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Vec<PageText>> {
        let path = path.as_ref();
        let filename = display_name(path);
        DocumentFormat::from_filename(&filename)?;
        let bytes = std::fs::read(path)?;
        self.read_bytes(&filename, &bytes)
    }

    /// Read an in-memory upload.
    pub fn read_bytes(&self, filename: &str, bytes: &[u8]) -> Result<Vec<PageText>> {
        let pages = match DocumentFormat::from_filename(filename)? {
            DocumentFormat::Pdf => read_pdf(filename, bytes)?,
            DocumentFormat::Docx => read_docx(filename, bytes)?,
        };
        debug!(filename, pages = pages.len(), "extracted document text");
        Ok(pages)
    }

    /// Join page texts with newlines into the whole-document text.
    pub fn full_text(pages: &[PageText]) -> String {
        pages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
    }
}

/// The last path component, used as the chunk filename.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extraction_failed(filename: &str, message: impl Into<String>) -> RagError {
    RagError::ExtractionFailed { filename: filename.to_string(), message: message.into() }
}

fn read_pdf(filename: &str, bytes: &[u8]) -> Result<Vec<PageText>> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| extraction_failed(filename, format!("not a readable PDF: {e}")))?;

    let pages = document
        .get_pages()
        .keys()
        .map(|&page| {
            let text = document.extract_text(&[page]).unwrap_or_else(|e| {
                warn!(filename, page, error = %e, "page text extraction failed");
                String::new()
            });
            PageText { text, page, filename: filename.to_string() }
        })
        .collect();

    Ok(pages)
}

fn read_docx(filename: &str, bytes: &[u8]) -> Result<Vec<PageText>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| extraction_failed(filename, format!("not a readable DOCX container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| extraction_failed(filename, format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| extraction_failed(filename, format!("unreadable word/document.xml: {e}")))?;

    let paragraphs = docx_paragraphs(&xml)
        .map_err(|e| extraction_failed(filename, format!("malformed document XML: {e}")))?;

    Ok(vec![PageText { text: paragraphs.join("\n"), page: 1, filename: filename.to_string() }])
}

/// Collect the plain text of every `w:p` paragraph in document order.
///
/// Paragraphs nested in text boxes get their own entry after the paragraph
/// that contains them, without disturbing its text. `mc:Fallback` subtrees
/// repeat the `mc:Choice` content and are skipped.
fn docx_paragraphs(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs: Vec<String> = Vec::new();
    // Indexes into `paragraphs` of the open `w:p` elements, innermost last.
    let mut open: Vec<usize> = Vec::new();
    let mut run_depth = 0usize;
    let mut fallback_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) if e.name().as_ref() == b"mc:Fallback" => {
                fallback_depth += 1;
                continue;
            }
            Event::End(e) if e.name().as_ref() == b"mc:Fallback" => {
                fallback_depth = fallback_depth.saturating_sub(1);
                continue;
            }
            Event::Eof => break,
            _ if fallback_depth > 0 => continue,
            _ => {}
        }

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"w:r" => run_depth += 1,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.pop();
                }
                b"w:r" => run_depth = run_depth.saturating_sub(1),
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match (e.name().as_ref(), open.last()) {
                (b"w:p", _) => paragraphs.push(String::new()),
                // Tab stops in paragraph properties are also `w:tab`; only runs carry text.
                (b"w:tab", Some(&i)) if run_depth > 0 => paragraphs[i].push('\t'),
                (b"w:br" | b"w:cr", Some(&i)) if run_depth > 0 => paragraphs[i].push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(&i) = open.last() {
                    paragraphs[i].push_str(&t.unescape()?);
                }
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}
