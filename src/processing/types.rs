//! Service errors, requests, and the JSON reports returned to callers.

use crate::{
    analysis::AnalysisResult,
    chunking::ChunkingError,
    embedding::EmbeddingClientError,
    extraction::{ExtractionKind, GenerativeError},
    pdf::{PdfError, SplitFile},
    qdrant::{CollectionInfo, QdrantError},
    storage::StorageError,
};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// `status` value of every successful report.
pub const STATUS_SUCCESS: &str = "success";

/// Errors emitted by the analyze and split operations.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Reading or writing the bucket failed.
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),
    /// Source PDF could not be parsed or written.
    #[error("PDF processing failed: {0}")]
    Pdf(#[from] PdfError),
    /// Stored analysis did not match the analysis JSON contract.
    #[error("Invalid analysis JSON: {0}")]
    InvalidAnalysis(#[source] serde_json::Error),
    /// Analysis yielded no file to write.
    #[error("PDF splitting failed: no files were produced for {0}")]
    NothingSplit(String),
    /// Local file IO failed.
    #[error("Failed to access {path}: {source}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted by question and answer extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Reading or writing the bucket failed.
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),
    /// Model call failed for every batch.
    #[error("{kind} extraction failed: {source}")]
    Generation {
        /// Kind being extracted.
        kind: &'static str,
        /// Last model error.
        #[source]
        source: GenerativeError,
    },
}

/// Errors emitted by ingestion and search.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading or writing the bucket failed.
    #[error("Storage operation failed: {0}")]
    Storage(#[from] StorageError),
    /// Source PDF could not be parsed.
    #[error("PDF conversion failed: {0}")]
    Pdf(#[from] PdfError),
    /// Chunker could not be built.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant request failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Markdown produced no chunk.
    #[error("Failed to create chunks: document has no text")]
    NoChunks,
    /// Collection is already populated and the caller asked not to update it.
    #[error("Collection '{0}' already contains points; set update_existing to replace them")]
    CollectionExists(String),
    /// Provider returned vectors of the wrong size.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

/// Result of analyzing one bucket PDF.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Detected boundaries.
    pub analysis_result: AnalysisResult,
    /// Where `analysis.json` was written.
    pub analysis_gcs_path: String,
    /// Source PDF URI.
    pub pdf_path: String,
    /// Object prefix receiving every artifact of this PDF.
    pub pdf_folder: String,
}

/// Result of splitting one bucket PDF.
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Files written, in boundary order.
    pub split_files: Vec<SplitFile>,
    /// `split_files.len()`.
    pub total_files: usize,
    /// Source PDF URI.
    pub pdf_path: String,
}

/// Result of analyze followed by split.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Source PDF URI.
    pub pdf_path: String,
    /// Detected boundaries.
    pub analysis_result: AnalysisResult,
    /// Where `analysis.json` was written.
    pub analysis_gcs_path: String,
    /// Files written, in boundary order.
    pub split_files: Vec<SplitFile>,
    /// `split_files.len()`.
    pub total_files: usize,
}

/// Result of extracting one PDF.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// `questions` or `answers`.
    pub extraction_type: ExtractionKind,
    /// Subject key as requested.
    pub subject: String,
    /// Where the extraction JSON was written.
    pub extraction_gcs_path: String,
    /// Source PDF URI.
    pub pdf_path: String,
    /// Questions extracted, for question papers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<usize>,
    /// Answers extracted, for answer keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_answers: Option<usize>,
    /// Overview returned by the model.
    pub document_info: Value,
}

impl ExtractionReport {
    /// Items extracted regardless of kind.
    pub fn total(&self) -> usize {
        self.total_questions.or(self.total_answers).unwrap_or(0)
    }
}

/// Outcome for one PDF of a book folder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderFileResult {
    /// Object name of the source PDF.
    pub pdf_file: String,
    /// `success` or `error`.
    pub status: &'static str,
    /// Where the extraction JSON was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Items extracted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-kind summary of a book folder run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderKindReport {
    /// Folder the PDFs were read from.
    pub folder_path: String,
    /// Folder the JSON files were written to.
    pub output_folder: String,
    /// PDFs found.
    pub total_files: usize,
    /// PDFs extracted.
    pub successful_extractions: usize,
    /// PDFs that failed.
    pub failed_extractions: usize,
    /// One entry per PDF.
    pub results: Vec<FolderFileResult>,
}

/// Both kinds of a book folder run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderResults {
    /// Question papers.
    pub questions: FolderKindReport,
    /// Answer keys.
    pub answers: FolderKindReport,
}

/// Result of extracting a whole split book folder.
#[derive(Debug, Clone, Serialize)]
pub struct FolderReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Split output folder (`{pdf_stem}`).
    pub folder_path: String,
    /// Subject key as requested.
    pub subject: String,
    /// Question papers extracted.
    pub total_questions_extracted: usize,
    /// Answer keys extracted.
    pub total_answers_extracted: usize,
    /// PDFs that failed across both kinds.
    pub total_failed: usize,
    /// Output folder for questions.
    pub extracted_questions_path: String,
    /// Output folder for answers.
    pub extracted_answers_path: String,
    /// Per-kind details.
    pub results: FolderResults,
}

/// Supported subjects.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectsReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Accepted subject keys.
    pub subjects: Vec<&'static str>,
}

/// Parameters of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Source PDF (`gs://` URI or object name).
    pub pdf_path: String,
    /// Book the PDF belongs to.
    pub book_name: String,
    /// Chapter number, when the PDF is one chapter.
    pub chapter: Option<u32>,
    /// First page to ingest (1-based).
    pub start_page: Option<u32>,
    /// Last page to ingest (inclusive).
    pub end_page: Option<u32>,
    /// Replace points of an already populated collection.
    pub update_existing: bool,
}

/// Result of an ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Book name as requested.
    pub book_name: String,
    /// Chapter number as requested.
    pub chapter: Option<u32>,
    /// Target collection.
    pub collection_name: String,
    /// Chunks produced by the chunker.
    pub chunks_created: usize,
    /// Vectors produced or loaded from the cache.
    pub embeddings_generated: usize,
    /// Whether the vectors came from the embeddings cache.
    pub embeddings_cached: bool,
    /// Where the markdown rendition was written.
    pub markdown_gcs_path: String,
    /// Collection statistics after the upsert.
    pub collection_info: CollectionInfo,
}

/// Parameters of a similarity search.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Natural language query.
    pub query: String,
    /// Book to search.
    pub book_name: String,
    /// Chapter collection to search.
    pub chapter: Option<u32>,
    /// Maximum hits (configured default when absent).
    pub limit: Option<usize>,
    /// Minimum score (configured default when absent).
    pub score_threshold: Option<f32>,
}

/// One search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Point id.
    pub id: String,
    /// Cosine similarity.
    pub score: f32,
    /// Chunk text.
    pub content: String,
    /// Remaining payload fields.
    pub metadata: Map<String, Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Query as requested.
    pub query: String,
    /// Book as requested.
    pub book_name: String,
    /// Chapter as requested.
    pub chapter: Option<u32>,
    /// Collection searched.
    pub collection_name: String,
    /// Hits ordered by descending score.
    pub results: Vec<SearchHit>,
    /// `results.len()`.
    pub total_results: usize,
}

/// Every collection with its statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionsReport {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Collection statistics.
    pub collections: Vec<CollectionInfo>,
    /// `collections.len()`.
    pub total_collections: usize,
}
