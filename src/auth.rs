//! Google Cloud OAuth access tokens for the Storage and Vertex AI REST APIs.

use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Errors raised while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Metadata server could not be reached.
    #[error("Metadata server request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Metadata server answered with a non-success status.
    #[error("Metadata server returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: reqwest::StatusCode,
        /// Response body for diagnostics.
        body: String,
    },
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Supplies bearer tokens: a fixed token when configured, otherwise the GCE metadata server.
pub struct AccessTokenProvider {
    client: Client,
    static_token: Option<String>,
    metadata_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokenProvider {
    /// Provider that always returns `token`.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            static_token: Some(token.into()),
            metadata_url: METADATA_TOKEN_URL.to_string(),
            cached: Mutex::new(None),
        }
    }

    /// Provider backed by the metadata server at `metadata_url`.
    pub fn metadata(metadata_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            static_token: None,
            metadata_url: metadata_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// Use `GCP_ACCESS_TOKEN` when set, the default metadata endpoint otherwise.
    pub fn from_config(config: &crate::config::Config) -> Self {
        match config.gcp_access_token.as_deref() {
            Some(token) => Self::fixed(token),
            None => Self::metadata(METADATA_TOKEN_URL),
        }
    }

    /// Current access token, refreshed shortly before it expires.
    pub async fn token(&self) -> Result<String, AuthError> {
        if let Some(token) = &self.static_token {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref()
            && Instant::now() < entry.refresh_at
        {
            return Ok(entry.token.clone());
        }

        let response = self
            .client
            .get(&self.metadata_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::UnexpectedStatus { status, body });
        }
        let fetched: MetadataToken = response.json().await?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(REFRESH_MARGIN);
        tracing::debug!(expires_in = fetched.expires_in, "Fetched metadata access token");

        *cached = Some(CachedToken {
            token: fetched.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fetched.access_token)
    }
}
