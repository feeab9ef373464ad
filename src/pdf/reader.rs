//! PDF loading, metadata, and per-page text extraction on top of `lopdf`.

use lopdf::{Document, Object};
use std::path::Path;
use thiserror::Error;

/// Title used when neither the metadata nor the first page provides one.
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Errors raised while reading or rewriting PDF files.
#[derive(Debug, Error)]
pub enum PdfError {
    /// A PDF file or its output folder could not be read or written.
    #[error("PDF file I/O failed for {path}: {source}")]
    Io {
        /// Path we attempted to read or write.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Bytes could not be parsed as a PDF document.
    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),
    /// Requested page range does not fit the document.
    #[error("Page range {start}-{end} is outside the document ({total} pages)")]
    PageRange {
        /// First requested page.
        start: u32,
        /// Last requested page.
        end: u32,
        /// Pages in the document.
        total: u32,
    },
    /// Serializing a rewritten document failed.
    #[error("Failed to write PDF: {0}")]
    Write(String),
}

/// Text content of a document, one entry per page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentText {
    /// Title from the document information dictionary, when present.
    pub metadata_title: Option<String>,
    /// Page text in page order; index 0 is page 1.
    pub pages: Vec<String>,
}

impl DocumentText {
    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Metadata title, else the first non-empty line of page 1, else [`UNKNOWN_TITLE`].
    pub fn book_title(&self) -> String {
        if let Some(title) = self.metadata_title.as_deref()
            && !title.trim().is_empty()
        {
            return title.trim().to_string();
        }
        self.pages
            .first()
            .and_then(|page| page.lines().map(str::trim).find(|line| !line.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }
}

/// A parsed PDF held in memory.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    document: Document,
}

impl PdfDocument {
    /// Parse a document from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let document = Document::load_mem(bytes)?;
        Ok(Self { document })
    }

    /// Read and parse a document from disk.
    pub fn open(path: &Path) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path).map_err(|source| PdfError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Number of pages in the page tree.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Extract the text of one page (1-based).
    pub fn page_text(&self, page: u32) -> Result<String, PdfError> {
        Ok(self.document.extract_text(&[page])?)
    }

    /// Title stored in the trailer's `Info` dictionary.
    pub fn metadata_title(&self) -> Option<String> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let dictionary = match info {
            Object::Reference(id) => self.document.get_dictionary(*id).ok()?,
            Object::Dictionary(dictionary) => dictionary,
            _ => return None,
        };
        match dictionary.get(b"Title").ok()? {
            Object::String(bytes, _) => {
                let title = decode_pdf_string(bytes);
                let title = title.trim();
                (!title.is_empty()).then(|| title.to_string())
            }
            _ => None,
        }
    }

    /// Extract every page. Pages that fail to decode come back empty.
    pub fn text(&self) -> DocumentText {
        let pages = (1..=self.page_count())
            .map(|page| match self.page_text(page) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(page, error = %err, "Failed to extract page text");
                    String::new()
                }
            })
            .collect();
        DocumentText {
            metadata_title: self.metadata_title(),
            pages,
        }
    }

    /// Build a new PDF holding pages `start..=end` (1-based, inclusive).
    pub fn extract_range(&self, start: u32, end: u32) -> Result<Vec<u8>, PdfError> {
        let total = self.page_count();
        if start == 0 || start > end || end > total {
            return Err(PdfError::PageRange { start, end, total });
        }

        let mut document = self.document.clone();
        let outside: Vec<u32> = (1..=total)
            .filter(|page| *page < start || *page > end)
            .collect();
        if !outside.is_empty() {
            document.delete_pages(&outside);
            document.prune_objects();
        }
        document.compress();

        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|err| PdfError::Write(err.to_string()))?;
        Ok(buffer)
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, otherwise single-byte.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|byte| char::from(*byte)).collect(),
    }
}
