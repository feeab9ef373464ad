//! Vertex AI text embedding models over the `:predict` REST endpoint.

use super::{EmbeddingClient, EmbeddingClientError};
use crate::auth::AccessTokenProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const DOCUMENT_TASK: &str = "RETRIEVAL_DOCUMENT";
const QUERY_TASK: &str = "RETRIEVAL_QUERY";

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: PredictionEmbedding,
}

#[derive(Debug, Deserialize)]
struct PredictionEmbedding {
    values: Vec<f32>,
}

/// Embedding client for Vertex AI publisher models such as `text-embedding-004`.
pub struct VertexEmbeddingClient {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) dimension: usize,
    pub(crate) batch_size: usize,
    pub(crate) tokens: Arc<AccessTokenProvider>,
}

impl VertexEmbeddingClient {
    /// Build a client for `model` under `base_url`.
    pub fn new(
        base_url: &str,
        project: &str,
        location: &str,
        model: &str,
        dimension: usize,
        batch_size: usize,
        tokens: Arc<AccessTokenProvider>,
    ) -> Result<Self, EmbeddingClientError> {
        let client = Client::builder().user_agent("paperslice/0.1").build()?;
        let endpoint = format!(
            "{}/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict",
            base_url.trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            dimension,
            batch_size: batch_size.max(1),
            tokens,
        })
    }

    async fn predict(
        &self,
        texts: &[String],
        task_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let instances: Vec<_> = texts
            .iter()
            .map(|text| json!({ "content": text, "task_type": task_type }))
            .collect();
        let body = json!({
            "instances": instances,
            "parameters": { "outputDimensionality": self.dimension, "autoTruncate": true }
        });

        let token = self.tokens.token().await?;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = EmbeddingClientError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Vertex embedding request failed");
            return Err(error);
        }

        let parsed: PredictResponse = response.json().await?;
        if parsed.predictions.len() != texts.len() {
            return Err(EmbeddingClientError::CountMismatch {
                expected: texts.len(),
                actual: parsed.predictions.len(),
            });
        }
        Ok(parsed
            .predictions
            .into_iter()
            .map(|prediction| prediction.embeddings.values)
            .collect())
    }
}

#[async_trait]
impl EmbeddingClient for VertexEmbeddingClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for (index, batch) in texts.chunks(self.batch_size).enumerate() {
            tracing::debug!(batch = index, size = batch.len(), "Requesting Vertex embeddings");
            embeddings.extend(self.predict(batch, DOCUMENT_TASK).await?);
        }
        tracing::info!(count = embeddings.len(), "Generated Vertex embeddings");
        Ok(embeddings)
    }

    async fn generate_query_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        self.predict(&[text.to_string()], QUERY_TASK)
            .await?
            .into_iter()
            .next()
            .ok_or(EmbeddingClientError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }
}
