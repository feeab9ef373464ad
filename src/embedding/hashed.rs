//! Deterministic bag-of-words embeddings for offline runs and tests.

use super::{EmbeddingClient, EmbeddingClientError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Hashes lowercase word tokens into a fixed number of signed buckets.
///
/// Texts sharing vocabulary land close together under cosine similarity, which is enough to
/// exercise the ingestion and search paths without a model.
pub struct HashedEmbeddingClient {
    dimension: usize,
}

impl HashedEmbeddingClient {
    /// Client producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut index_bytes = [0_u8; 8];
            index_bytes.copy_from_slice(&digest[..8]);
            let position = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[position] += sign;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashedEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        tracing::debug!(count = texts.len(), dimension = self.dimension, "Hashing embeddings");
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn vectors_are_normalized_and_deterministic() {
        let client = HashedEmbeddingClient::new(16);
        let first = client
            .generate_embeddings(vec!["Binary search trees".into()])
            .await
            .expect("embed");
        let second = client
            .generate_embeddings(vec!["binary SEARCH trees".into()])
            .await
            .expect("embed");
        assert_eq!(first, second);
        let norm: f32 = first[0].iter().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let client = HashedEmbeddingClient::new(64);
        let vectors = client
            .generate_embeddings(vec![
                "arrays and loops in java".into(),
                "loops in java arrays".into(),
                "photosynthesis releases oxygen".into(),
            ])
            .await
            .expect("embed");
        assert!(cosine(&vectors[0], &vectors[1]) > cosine(&vectors[0], &vectors[2]));
    }

    #[tokio::test]
    async fn rejects_empty_input_and_zero_dimension() {
        assert!(
            HashedEmbeddingClient::new(8)
                .generate_embeddings(Vec::new())
                .await
                .is_err()
        );
        assert!(
            HashedEmbeddingClient::new(0)
                .generate_embeddings(vec!["text".into()])
                .await
                .is_err()
        );
    }
}
