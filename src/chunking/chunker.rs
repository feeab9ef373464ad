//! Semantic chunking of book markdown.
//!
//! Markdown is split at headings, sections at blank lines, and paragraphs are packed into
//! chunks of at most `max_tokens`. Each chunk after the first in a section starts with the
//! last `overlap_tokens` of its predecessor so sentences near a boundary stay retrievable.
//! Chunks smaller than `min_tokens` are folded into a neighbour when the result still fits.

use super::metadata::{ChunkMetadata, extract_metadata};
use super::sections::{Paragraph, parse_sections, split_paragraphs};
use super::tokens::{TokenCounter, cl100k_counter, tail_with_token_limit};
use super::ChunkingError;
use crate::config::get_config;
use serde::Serialize;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// A retrievable unit of book text.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    /// Chunk text, including any overlap carried from the previous chunk.
    pub content: String,
    /// Position of the chunk in the document.
    pub chunk_index: usize,
    /// Byte offset of the first new paragraph in the source markdown.
    pub start_position: usize,
    /// Byte offset one past the last paragraph in the source markdown.
    pub end_position: usize,
    /// Tokens in `content`.
    pub token_count: usize,
    /// Heading of the section the chunk came from.
    pub section_title: String,
    /// Depth of that heading.
    pub section_level: usize,
    /// Derived metadata.
    pub metadata: ChunkMetadata,
}

/// Token-budgeted markdown chunker.
pub struct SemanticChunker {
    max_tokens: usize,
    overlap_tokens: usize,
    min_tokens: usize,
    token_counter: TokenCounter,
}

struct Draft {
    content: String,
    start: usize,
    end: usize,
    tokens: usize,
    section_title: String,
    section_level: usize,
}

impl SemanticChunker {
    /// Chunker using `cl100k_base` token counts.
    pub fn new(
        max_tokens: usize,
        overlap_tokens: usize,
        min_tokens: usize,
    ) -> Result<Self, ChunkingError> {
        Self::with_counter(max_tokens, overlap_tokens, min_tokens, cl100k_counter()?)
    }

    /// Chunker sized from `CHUNK_MAX_TOKENS`, `CHUNK_OVERLAP_TOKENS`, and `CHUNK_MIN_TOKENS`.
    pub fn from_config() -> Result<Self, ChunkingError> {
        let config = get_config();
        Self::new(
            config.chunk_max_tokens,
            config.chunk_overlap_tokens,
            config.chunk_min_tokens,
        )
    }

    /// Chunker with a caller-supplied token counter. Overlap is capped below `max_tokens`.
    pub fn with_counter(
        max_tokens: usize,
        overlap_tokens: usize,
        min_tokens: usize,
        token_counter: TokenCounter,
    ) -> Result<Self, ChunkingError> {
        if max_tokens == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            max_tokens,
            overlap_tokens: overlap_tokens.min(max_tokens.saturating_sub(1)),
            min_tokens: min_tokens.min(max_tokens),
            token_counter,
        })
    }

    /// Split `markdown` into chunks; `chapter` is recorded in every chunk's metadata.
    pub fn chunk_markdown(&self, markdown: &str, chapter: Option<u32>) -> Vec<Chunk> {
        let mut drafts = Vec::new();
        for section in parse_sections(markdown) {
            let paragraphs = split_paragraphs(&section, self.max_tokens, &self.token_counter);
            self.pack_section(&paragraphs, &section.title, section.level, &mut drafts);
        }
        let drafts = self.merge_small(drafts);

        let chunks: Vec<Chunk> = drafts
            .into_iter()
            .enumerate()
            .map(|(chunk_index, draft)| Chunk {
                metadata: extract_metadata(&draft.content, chapter),
                content: draft.content,
                chunk_index,
                start_position: draft.start,
                end_position: draft.end,
                token_count: draft.tokens,
                section_title: draft.section_title,
                section_level: draft.section_level,
            })
            .collect();

        tracing::info!(
            chunks = chunks.len(),
            max_tokens = self.max_tokens,
            overlap_tokens = self.overlap_tokens,
            "Chunked markdown"
        );
        chunks
    }

    fn count(&self, text: &str) -> usize {
        self.token_counter.as_ref()(text)
    }

    fn pack_section(
        &self,
        paragraphs: &[Paragraph],
        title: &str,
        level: usize,
        drafts: &mut Vec<Draft>,
    ) {
        let mut current: Option<Draft> = None;

        for paragraph in paragraphs {
            let Some(mut draft) = current.take() else {
                current = Some(self.open_draft(String::new(), paragraph, title, level));
                continue;
            };

            let candidate = join(&draft.content, &paragraph.text);
            let tokens = self.count(&candidate);
            if tokens <= self.max_tokens {
                draft.content = candidate;
                draft.end = paragraph.end();
                draft.tokens = tokens;
                current = Some(draft);
                continue;
            }

            let overlap =
                tail_with_token_limit(&draft.content, self.overlap_tokens, &self.token_counter)
                    .to_string();
            drafts.push(draft);
            current = Some(self.open_draft(overlap, paragraph, title, level));
        }

        drafts.extend(current);
    }

    fn open_draft(
        &self,
        overlap: String,
        paragraph: &Paragraph,
        title: &str,
        level: usize,
    ) -> Draft {
        let mut content = join(&overlap, &paragraph.text);
        let mut tokens = self.count(&content);
        if tokens > self.max_tokens {
            content = paragraph.text.clone();
            tokens = self.count(&content);
        }
        Draft {
            content,
            start: paragraph.offset,
            end: paragraph.end(),
            tokens,
            section_title: title.to_string(),
            section_level: level,
        }
    }

    fn merge_small(&self, drafts: Vec<Draft>) -> Vec<Draft> {
        let mut merged: Vec<Draft> = Vec::with_capacity(drafts.len());
        let mut pending: Option<Draft> = None;

        for mut draft in drafts {
            if let Some(head) = pending.take() {
                let candidate = join(&head.content, &draft.content);
                let tokens = self.count(&candidate);
                if tokens <= self.max_tokens {
                    draft.content = candidate;
                    draft.start = head.start;
                    draft.tokens = tokens;
                    draft.section_title = head.section_title;
                    draft.section_level = head.section_level;
                } else {
                    merged.push(head);
                }
            }

            if draft.tokens >= self.min_tokens {
                merged.push(draft);
                continue;
            }

            match merged.last_mut() {
                Some(previous) => {
                    let candidate = join(&previous.content, &draft.content);
                    let tokens = self.count(&candidate);
                    if tokens <= self.max_tokens {
                        previous.content = candidate;
                        previous.end = draft.end;
                        previous.tokens = tokens;
                    } else {
                        merged.push(draft);
                    }
                }
                // Nothing before it: try the next chunk instead.
                None => pending = Some(draft),
            }
        }

        merged.extend(pending);
        merged
    }
}

fn join(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head}{PARAGRAPH_SEPARATOR}{tail}"),
    }
}
