//! Cloud Storage JSON API client.

use super::{GcsPath, ObjectStore, StorageError};
use crate::auth::AccessTokenProvider;
use crate::config::get_config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

/// Thin reqwest wrapper over the Storage JSON API.
pub struct GcsClient {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) default_bucket: String,
    pub(crate) tokens: Arc<AccessTokenProvider>,
}

impl GcsClient {
    /// Construct a client from the global configuration.
    pub fn new(tokens: Arc<AccessTokenProvider>) -> Result<Self, StorageError> {
        let config = get_config();
        let base_url = config
            .storage_base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        Self::with_base_url(base_url, &config.bucket_name, tokens)
    }

    /// Construct a client against an explicit endpoint.
    pub fn with_base_url(
        base_url: &str,
        default_bucket: &str,
        tokens: Arc<AccessTokenProvider>,
    ) -> Result<Self, StorageError> {
        let base_url =
            Url::parse(base_url).map_err(|err| StorageError::InvalidPath(err.to_string()))?;
        let client = Client::builder().user_agent("paperslice/0.1").build()?;
        tracing::debug!(url = %base_url, bucket = default_bucket, "Initialized storage client");
        Ok(Self {
            client,
            base_url,
            default_bucket: default_bucket.to_string(),
            tokens,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::InvalidPath(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorized(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> Result<reqwest::RequestBuilder, StorageError> {
        let token = self.tokens.token().await?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn ensure_success(
        &self,
        response: reqwest::Response,
        path: &str,
    ) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        let error = StorageError::UnexpectedStatus { status, body };
        tracing::error!(error = %error, path, "Storage request failed");
        Err(error)
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    async fn download(&self, path: &GcsPath) -> Result<Vec<u8>, StorageError> {
        let mut url = self.endpoint(&["storage", "v1", "b", &path.bucket, "o", &path.object])?;
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.authorized(reqwest::Method::GET, url).await?.send().await?;
        let response = self.ensure_success(response, &path.to_string()).await?;
        let bytes = response.bytes().await?;
        tracing::debug!(path = %path, size = bytes.len(), "Downloaded object");
        Ok(bytes.to_vec())
    }

    async fn upload(
        &self,
        path: &GcsPath,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut url = self.endpoint(&["upload", "storage", "v1", "b", &path.bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &path.object);

        let size = bytes.len();
        let response = self
            .authorized(reqwest::Method::POST, url)
            .await?
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        self.ensure_success(response, &path.to_string()).await?;
        tracing::info!(path = %path, size, content_type, "Uploaded object");
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["storage", "v1", "b", bucket, "o"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let response = self.authorized(reqwest::Method::GET, url).await?.send().await?;
            let response = self
                .ensure_success(response, &format!("gs://{bucket}/{prefix}"))
                .await?;
            let page: ListResponse = response.json().await?;
            names.extend(page.items.into_iter().map(|item| item.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(bucket, prefix, count = names.len(), "Listed objects");
        Ok(names)
    }
}
