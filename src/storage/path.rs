//! `gs://` URIs and the object layout shared by the services.

use super::StorageError;
use std::fmt;

/// A bucket-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GcsPath {
    /// Bucket name.
    pub bucket: String,
    /// Object name inside the bucket (may contain `/`).
    pub object: String,
}

impl GcsPath {
    /// Build a path from its parts.
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }

    /// Parse `gs://bucket/object`, or a bare object name placed in `default_bucket`.
    pub fn parse(input: &str, default_bucket: &str) -> Result<Self, StorageError> {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix("gs://") {
            let (bucket, object) = rest
                .split_once('/')
                .ok_or_else(|| StorageError::InvalidPath(input.to_string()))?;
            if bucket.is_empty() || object.trim_matches('/').is_empty() {
                return Err(StorageError::InvalidPath(input.to_string()));
            }
            return Ok(Self::new(bucket, object));
        }

        let object = trimmed.trim_start_matches('/');
        if object.is_empty() || default_bucket.is_empty() {
            return Err(StorageError::InvalidPath(input.to_string()));
        }
        Ok(Self::new(default_bucket, object))
    }

    /// Sibling object in the same bucket.
    pub fn with_object(&self, object: impl Into<String>) -> Self {
        Self::new(self.bucket.clone(), object)
    }

    /// Last path segment of the object name.
    pub fn file_name(&self) -> &str {
        self.object.rsplit('/').next().unwrap_or(&self.object)
    }

    /// Object name without a trailing `.pdf`, used as the output folder of a book.
    pub fn pdf_stem(&self) -> &str {
        strip_pdf_suffix(&self.object)
    }

    /// File name without a trailing `.pdf`.
    pub fn file_stem(&self) -> &str {
        strip_pdf_suffix(self.file_name())
    }
}

impl fmt::Display for GcsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}

fn strip_pdf_suffix(name: &str) -> &str {
    let len = name.len();
    if len > 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &name[..len - 4]
    } else {
        name
    }
}

/// `{stem}/analysis.json`
pub fn analysis_object(stem: &str) -> String {
    format!("{stem}/analysis.json")
}

/// `{stem}/{folder}/{filename}`
pub fn split_object(stem: &str, folder: &str, filename: &str) -> String {
    format!("{stem}/{folder}/{filename}")
}

/// `extractions/{questions|answers}/{stem}_{questions|answers}.json`
pub fn extraction_object(kind: &str, source_object: &str) -> String {
    format!("extractions/{kind}/{}_{kind}.json", strip_pdf_suffix(source_object))
}

/// `books/{book}/chapter_NN.md`, or `full_book.md` without a chapter.
pub fn markdown_object(book: &str, chapter: Option<u32>) -> String {
    match chapter {
        Some(chapter) => format!("books/{book}/chapter_{chapter:02}.md"),
        None => format!("books/{book}/full_book.md"),
    }
}

/// `embeddings/{slug}/chapter_NN.json`, or `full_book.json` without a chapter.
pub fn embeddings_cache_object(book_slug: &str, chapter: Option<u32>) -> String {
    match chapter {
        Some(chapter) => format!("embeddings/{book_slug}/chapter_{chapter:02}.json"),
        None => format!("embeddings/{book_slug}/full_book.json"),
    }
}
