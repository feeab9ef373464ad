//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Collection does not exist.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),
}

/// Book-level fields copied into every point payload.
#[derive(Debug, Clone, Default)]
pub struct PayloadContext {
    /// Book the chunks came from.
    pub book_name: String,
    /// Chapter number, when ingesting a single chapter.
    pub chapter_number: Option<u32>,
    /// URI of the source PDF.
    pub source_uri: Option<String>,
}

/// Prepared point ready for indexing, including text, hash, and vector.
#[derive(Debug, Clone)]
pub struct PointInsert {
    /// Position of the chunk within the document.
    pub chunk_index: usize,
    /// Raw chunk text.
    pub text: String,
    /// Deterministic hash of the chunk text.
    pub chunk_hash: String,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
    /// Chunk metadata stored under the `metadata` payload key.
    pub metadata: Map<String, Value>,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

/// Summary describing how Qdrant applied an indexing request.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexSummary {
    /// Number of points written by the request.
    pub upserted: usize,
}

/// Collection statistics reported by Qdrant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Collection status (`green`, `yellow`, ...).
    pub status: String,
    /// Stored vectors (older Qdrant releases only; 0 otherwise).
    pub vectors_count: u64,
    /// Indexed vectors.
    pub indexed_vectors_count: u64,
    /// Stored points.
    pub points_count: u64,
    /// Segment count.
    pub segments_count: u64,
}

#[derive(Deserialize)]
pub(crate) struct ListCollectionsResponse {
    pub(crate) result: ListCollectionsResult,
}

#[derive(Deserialize)]
pub(crate) struct ListCollectionsResult {
    pub(crate) collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionDescription {
    pub(crate) name: String,
}

#[derive(Deserialize)]
pub(crate) struct CollectionResponse {
    pub(crate) result: CollectionResult,
}

#[derive(Deserialize)]
pub(crate) struct CollectionResult {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) vectors_count: Option<u64>,
    #[serde(default)]
    pub(crate) indexed_vectors_count: Option<u64>,
    #[serde(default)]
    pub(crate) points_count: Option<u64>,
    #[serde(default)]
    pub(crate) segments_count: Option<u64>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
