//! Embeddings cached in the bucket, keyed by book and chapter.
//!
//! A cached file is reused only when its content hash matches the current chunk texts.

use crate::{
    chunking::Chunk,
    storage::{GcsPath, ObjectStore, StorageError},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CacheMetadata {
    pub(crate) book_name: String,
    pub(crate) chapter: Option<u32>,
    pub(crate) created_at: String,
    pub(crate) content_hash: String,
    pub(crate) chunk_count: usize,
    pub(crate) embedding_dimension: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CachedEmbeddings {
    pub(crate) metadata: CacheMetadata,
    #[serde(default)]
    pub(crate) chunks: Value,
    pub(crate) embeddings: Vec<Vec<f32>>,
}

/// SHA-256 over the concatenated chunk texts.
pub(crate) fn content_hash(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.content.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Cached vectors at `path` when they were computed for `hash`.
pub(crate) async fn load(
    store: &dyn ObjectStore,
    path: &GcsPath,
    hash: &str,
    dimension: usize,
) -> Option<Vec<Vec<f32>>> {
    let value = match store.download_json(path).await {
        Ok(value) => value,
        Err(StorageError::NotFound(_)) => return None,
        Err(error) => {
            tracing::warn!(cache = %path, error = %error, "Failed to read embeddings cache");
            return None;
        }
    };
    let cached: CachedEmbeddings = match serde_json::from_value(value) {
        Ok(cached) => cached,
        Err(error) => {
            tracing::warn!(cache = %path, error = %error, "Ignoring malformed embeddings cache");
            return None;
        }
    };

    let metadata = &cached.metadata;
    if metadata.content_hash != hash
        || metadata.chunk_count != cached.embeddings.len()
        || metadata.embedding_dimension != dimension
    {
        tracing::info!(cache = %path, "Embeddings cache is stale");
        return None;
    }
    tracing::info!(cache = %path, count = cached.embeddings.len(), "Using cached embeddings");
    Some(cached.embeddings)
}

/// Store `embeddings` for `chunks`; failures are logged and otherwise ignored.
pub(crate) async fn save(
    store: &dyn ObjectStore,
    path: &GcsPath,
    metadata: CacheMetadata,
    chunks: &[Chunk],
    embeddings: &[Vec<f32>],
) {
    let cached = CachedEmbeddings {
        metadata,
        chunks: serde_json::to_value(chunks).unwrap_or(Value::Null),
        embeddings: embeddings.to_vec(),
    };
    let result = match serde_json::to_value(&cached) {
        Ok(value) => store.upload_json(path, &value).await,
        Err(source) => Err(StorageError::Json {
            path: path.to_string(),
            source,
        }),
    };
    match result {
        Ok(()) => tracing::info!(
            cache = %path,
            count = embeddings.len(),
            "Saved embeddings cache"
        ),
        Err(error) => tracing::warn!(
            cache = %path,
            error = %error,
            "Failed to save embeddings cache"
        ),
    }
}
