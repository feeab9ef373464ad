use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by the HTTP server and the job CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Google Cloud project that owns the bucket and the Vertex AI endpoints.
    pub gcp_project_id: String,
    /// Default Cloud Storage bucket used for inputs and outputs.
    pub bucket_name: String,
    /// Vertex AI region (for example `us-central1`).
    pub vertex_location: String,
    /// Static OAuth access token; when absent the metadata server is queried.
    pub gcp_access_token: Option<String>,
    /// Override for the Cloud Storage JSON API endpoint.
    pub storage_base_url: Option<String>,
    /// Override for the Vertex AI endpoint.
    pub vertex_base_url: Option<String>,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Number of texts sent per embedding request.
    pub embedding_batch_size: usize,
    /// Generative model used for question/answer extraction.
    pub generative_model: String,
    /// Upper token bound for a single chunk.
    pub chunk_max_tokens: usize,
    /// Tokens carried over from the previous chunk.
    pub chunk_overlap_tokens: usize,
    /// Chunks below this token count are merged into their predecessor.
    pub chunk_min_tokens: usize,
    /// Default number of search hits.
    pub search_default_limit: usize,
    /// Default minimum similarity score for search hits.
    pub search_default_score_threshold: f32,
    /// HTTP port for the server binary.
    pub server_port: u16,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Vertex AI text embedding models.
    Vertex,
    /// Deterministic local hashing, for offline runs and tests.
    Hashed,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gcp_project_id: load_env("GCP_PROJECT_ID")?,
            bucket_name: load_env("BUCKET_NAME")?,
            vertex_location: load_env_optional("VERTEX_AI_LOCATION")
                .unwrap_or_else(|| "us-central1".to_string()),
            gcp_access_token: load_env_optional("GCP_ACCESS_TOKEN"),
            storage_base_url: load_env_optional("STORAGE_BASE_URL"),
            vertex_base_url: load_env_optional("VERTEX_API_BASE_URL"),
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: load_env_optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))
                })
                .transpose()?
                .unwrap_or(EmbeddingProvider::Vertex),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-004".to_string()),
            embedding_dimension: parse_optional("EMBEDDING_DIMENSION")?.unwrap_or(768),
            embedding_batch_size: parse_optional("EMBEDDING_BATCH_SIZE")?.unwrap_or(100),
            generative_model: load_env_optional("GENERATIVE_MODEL")
                .unwrap_or_else(|| "gemini-2.5-pro".to_string()),
            chunk_max_tokens: parse_optional("CHUNK_MAX_TOKENS")?.unwrap_or(1000),
            chunk_overlap_tokens: parse_optional("CHUNK_OVERLAP_TOKENS")?.unwrap_or(200),
            chunk_min_tokens: parse_optional("CHUNK_MIN_TOKENS")?.unwrap_or(100),
            search_default_limit: parse_optional("SEARCH_DEFAULT_LIMIT")?.unwrap_or(10),
            search_default_score_threshold: parse_optional("SEARCH_DEFAULT_SCORE_THRESHOLD")?
                .unwrap_or(0.7),
            server_port: parse_optional("PORT")?.unwrap_or(8080),
        })
    }

    /// Resolve the Vertex AI base URL for the configured region.
    pub fn vertex_endpoint(&self) -> String {
        self.vertex_base_url.clone().unwrap_or_else(|| {
            format!("https://{}-aiplatform.googleapis.com", self.vertex_location)
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vertex" | "vertexai" | "vertex-ai" => Ok(Self::Vertex),
            "hashed" | "local" => Ok(Self::Hashed),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    load_config().expect("Failed to load config from environment");
}

/// Load `.env` plus the environment into the global cache, returning the installed value.
///
/// A second call returns the configuration installed by the first.
pub fn load_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        project = %config.gcp_project_id,
        bucket = %config.bucket_name,
        qdrant_url = %config.qdrant_url,
        embedding_provider = ?config.embedding_provider,
        port = config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
pub(crate) fn test_config(storage_url: &str, qdrant_url: &str) -> Config {
    Config {
        gcp_project_id: "test-project".into(),
        bucket_name: "test-bucket".into(),
        vertex_location: "us-central1".into(),
        gcp_access_token: Some("test-token".into()),
        storage_base_url: Some(storage_url.into()),
        vertex_base_url: Some(storage_url.into()),
        qdrant_url: qdrant_url.into(),
        qdrant_api_key: None,
        embedding_provider: EmbeddingProvider::Hashed,
        embedding_model: "text-embedding-004".into(),
        embedding_dimension: 8,
        embedding_batch_size: 2,
        generative_model: "gemini-2.5-pro".into(),
        chunk_max_tokens: 64,
        chunk_overlap_tokens: 8,
        chunk_min_tokens: 4,
        search_default_limit: 10,
        search_default_score_threshold: 0.7,
        server_port: 8080,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_provider_parses_aliases() {
        assert_eq!("Vertex".parse(), Ok(EmbeddingProvider::Vertex));
        assert_eq!("vertex-ai".parse(), Ok(EmbeddingProvider::Vertex));
        assert_eq!("hashed".parse(), Ok(EmbeddingProvider::Hashed));
        assert!("ollama".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn vertex_endpoint_uses_region_unless_overridden() {
        let mut config = test_config("http://storage", "http://qdrant");
        config.vertex_base_url = None;
        assert_eq!(
            config.vertex_endpoint(),
            "https://us-central1-aiplatform.googleapis.com"
        );
        config.vertex_base_url = Some("http://localhost:9999".into());
        assert_eq!(config.vertex_endpoint(), "http://localhost:9999");
    }
}
