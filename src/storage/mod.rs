//! Object storage used for inputs, intermediate JSON, and outputs.

mod gcs;
mod path;

pub use gcs::GcsClient;
pub use path::{
    GcsPath, analysis_object, embeddings_cache_object, extraction_object, markdown_object,
    split_object,
};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Content type used for JSON uploads.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type used for PDF uploads.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Errors raised by object storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Path could not be interpreted as a bucket object.
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),
    /// Requested object does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),
    /// Access token could not be obtained.
    #[error("Failed to authenticate: {0}")]
    Auth(#[from] crate::auth::AuthError),
    /// HTTP transport failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend answered with a non-success status.
    #[error("Storage returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: reqwest::StatusCode,
        /// Response body for diagnostics.
        body: String,
    },
    /// Object body was not valid JSON.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        /// Object that failed to parse.
        path: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
}

/// Minimal object store surface the services depend on.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket used for bare object names.
    fn default_bucket(&self) -> &str;

    /// Fetch an object's bytes.
    async fn download(&self, path: &GcsPath) -> Result<Vec<u8>, StorageError>;

    /// Create or replace an object.
    async fn upload(
        &self,
        path: &GcsPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Object names in `bucket` starting with `prefix`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Fetch and parse a JSON object.
    async fn download_json(&self, path: &GcsPath) -> Result<Value, StorageError> {
        let bytes = self.download(path).await?;
        serde_json::from_slice(&bytes).map_err(|source| StorageError::Json {
            path: path.to_string(),
            source,
        })
    }

    /// Serialize and upload a JSON object.
    async fn upload_json(&self, path: &GcsPath, value: &Value) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
            path: path.to_string(),
            source,
        })?;
        self.upload(path, bytes, JSON_CONTENT_TYPE).await
    }

    /// Parse a user-supplied path against this store's default bucket.
    fn resolve(&self, input: &str) -> Result<GcsPath, StorageError> {
        GcsPath::parse(input, self.default_bucket())
    }
}
