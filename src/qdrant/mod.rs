//! Qdrant vector store integration.

pub mod client;
pub mod payload;
pub mod types;

pub use client::{QdrantService, chapter_filter};
pub use payload::{book_slug, collection_name, compute_chunk_hash, point_id};
pub use types::{
    CollectionInfo, IndexSummary, PayloadContext, PointInsert, QdrantError, ScoredPoint,
};
