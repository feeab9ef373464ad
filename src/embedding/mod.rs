//! Embedding client abstraction and adapters.

mod hashed;
mod vertex;

pub use hashed::HashedEmbeddingClient;
pub use vertex::VertexEmbeddingClient;

use crate::auth::{AccessTokenProvider, AuthError};
use crate::config::{EmbeddingProvider, get_config};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Access token could not be obtained.
    #[error("Failed to authenticate: {0}")]
    Auth(#[from] AuthError),
    /// HTTP transport failed.
    #[error("Embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("Embedding provider returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: reqwest::StatusCode,
        /// Response body for diagnostics.
        body: String,
    },
    /// Provider returned a different number of vectors than inputs.
    #[error("Expected {expected} embeddings, got {actual}")]
    CountMismatch {
        /// Inputs sent.
        expected: usize,
        /// Vectors received.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Produce the embedding of a search query.
    async fn generate_query_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        self.generate_embeddings(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingClientError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client(
    tokens: Arc<AccessTokenProvider>,
) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
    let config = get_config();
    match config.embedding_provider {
        EmbeddingProvider::Hashed => Ok(Arc::new(HashedEmbeddingClient::new(
            config.embedding_dimension,
        ))),
        EmbeddingProvider::Vertex => Ok(Arc::new(VertexEmbeddingClient::new(
            &config.vertex_endpoint(),
            &config.gcp_project_id,
            &config.vertex_location,
            &config.embedding_model,
            config.embedding_dimension,
            config.embedding_batch_size,
            tokens,
        )?)),
    }
}
