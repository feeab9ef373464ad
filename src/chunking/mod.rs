//! Markdown chunking and chunk metadata for the RAG ingestion pipeline.

mod chunker;
mod metadata;
mod sections;
mod tokens;

pub use chunker::{Chunk, SemanticChunker};
pub use metadata::{ChunkMetadata, extract_metadata};
pub use sections::{Paragraph, Section, parse_sections, split_paragraphs};
pub use tokens::{TokenCounter, cl100k_counter, whitespace_counter};

use anyhow::Error as TokenizerError;
use thiserror::Error;

/// Errors produced while turning markdown into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunking configured an impossible token budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable.
    #[error("failed to initialize tokenizer '{encoding}': {source}")]
    Tokenizer {
        /// Encoding we attempted to load.
        encoding: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}
