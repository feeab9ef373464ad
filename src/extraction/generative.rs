//! Generative model access for PDF extraction.

use crate::auth::{AccessTokenProvider, AuthError};
use crate::config::get_config;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by generative model backends.
#[derive(Debug, Error)]
pub enum GenerativeError {
    /// Access token could not be obtained.
    #[error("Failed to authenticate: {0}")]
    Auth(#[from] AuthError),
    /// HTTP transport failed.
    #[error("Generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider answered with a non-success status.
    #[error("Generative model returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: reqwest::StatusCode,
        /// Response body for diagnostics.
        body: String,
    },
    /// Response carried no text part.
    #[error("Generative model returned no text")]
    EmptyResponse,
}

/// A model that answers a text prompt about an attached PDF.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send `pdf` plus `prompt`; return the model's text answer.
    async fn generate(&self, pdf: &[u8], prompt: &str) -> Result<String, GenerativeError>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini models through Vertex AI `generateContent`.
pub struct VertexGenerativeClient {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) tokens: Arc<AccessTokenProvider>,
}

impl VertexGenerativeClient {
    /// Client for the configured project, region, and `GENERATIVE_MODEL`.
    pub fn from_config(tokens: Arc<AccessTokenProvider>) -> Result<Self, GenerativeError> {
        let config = get_config();
        Self::new(
            &config.vertex_endpoint(),
            &config.gcp_project_id,
            &config.vertex_location,
            &config.generative_model,
            tokens,
        )
    }

    /// Client for `model` under `base_url`.
    pub fn new(
        base_url: &str,
        project: &str,
        location: &str,
        model: &str,
        tokens: Arc<AccessTokenProvider>,
    ) -> Result<Self, GenerativeError> {
        let client = Client::builder().user_agent("paperslice/0.1").build()?;
        let endpoint = format!(
            "{}/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent",
            base_url.trim_end_matches('/')
        );
        Ok(Self {
            client,
            endpoint,
            tokens,
        })
    }
}

#[async_trait]
impl GenerativeClient for VertexGenerativeClient {
    async fn generate(&self, pdf: &[u8], prompt: &str) -> Result<String, GenerativeError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": "application/pdf",
                            "data": STANDARD.encode(pdf)
                        }
                    },
                    { "text": prompt }
                ]
            }],
            "generationConfig": { "temperature": 0.0 }
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
            let error = GenerativeError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Vertex generateContent failed");
            return Err(error);
        }

        let parsed: GenerateResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerativeError::EmptyResponse);
        }
        tracing::debug!(chars = text.len(), "Received model response");
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> VertexGenerativeClient {
        VertexGenerativeClient::new(
            &server.base_url(),
            "proj",
            "us-central1",
            "gemini-2.5-pro",
            Arc::new(AccessTokenProvider::fixed("test-token")),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn generate_sends_inline_pdf_and_joins_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/projects/proj/locations/us-central1/publishers/google/models/gemini-2.5-pro:generateContent")
                    .header("authorization", "Bearer test-token")
                    .body_contains("\"mimeType\":\"application/pdf\"")
                    .body_contains("\"data\":\"JVBERi0x\"")
                    .body_contains("List the questions");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{ "text": "{\"a\":" }, { "text": " 1}" }]
                        }
                    }]
                }));
            })
            .await;

        let text = client(&server)
            .generate(b"%PDF-1", "List the questions")
            .await
            .expect("generate");
        mock.assert();
        assert_eq!(text, "{\"a\": 1}");
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let error = client(&server)
            .generate(b"%PDF-1", "prompt")
            .await
            .expect_err("empty");
        assert!(matches!(error, GenerativeError::EmptyResponse));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("quota");
            })
            .await;

        let error = client(&server)
            .generate(b"%PDF-1", "prompt")
            .await
            .expect_err("quota");
        assert!(matches!(
            error,
            GenerativeError::UnexpectedStatus { status, .. } if status.as_u16() == 429
        ));
    }
}
