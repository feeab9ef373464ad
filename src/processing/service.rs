//! Pipeline service shared by the HTTP router and the CLI.

use super::{
    extract::{ExtractService, subjects_report},
    ingest::{IngestService, IngestSettings},
    split::SplitService,
    types::{
        AnalyzeReport, CollectionsReport, ExtractError, ExtractionReport, FolderReport,
        IngestError, IngestReport, IngestRequest, ProcessReport, SearchReport, SearchRequest,
        SplitError, SplitReport, SubjectsReport,
    },
};
use crate::{
    auth::AccessTokenProvider,
    chunking::{ChunkingError, SemanticChunker},
    config::get_config,
    embedding::{EmbeddingClientError, get_embedding_client},
    extraction::{ExtractionKind, GenerativeError, VertexGenerativeClient},
    metrics::{MetricsSnapshot, PipelineMetrics},
    qdrant::{QdrantError, QdrantService},
    storage::{GcsClient, ObjectStore, StorageError},
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while wiring the pipeline at startup.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Storage client could not be built.
    #[error("Failed to initialize storage: {0}")]
    Storage(#[from] StorageError),
    /// Embedding client could not be built.
    #[error("Failed to initialize embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Generative model client could not be built.
    #[error("Failed to initialize generative model: {0}")]
    Generative(#[from] GenerativeError),
    /// Qdrant client could not be built.
    #[error("Failed to initialize Qdrant: {0}")]
    Qdrant(#[from] QdrantError),
    /// Tokenizer could not be loaded.
    #[error("Failed to initialize chunker: {0}")]
    Chunking(#[from] ChunkingError),
}

/// Owns the split, extraction, and ingestion services plus their shared metrics.
///
/// Construct once near process start and share it through an `Arc`.
pub struct PipelineService {
    split: SplitService,
    extract: ExtractService,
    ingest: IngestService,
    metrics: Arc<PipelineMetrics>,
}

/// Operations exposed to external surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Analyze a bucket PDF and store `analysis.json`.
    async fn analyze(&self, pdf_path: &str) -> Result<AnalyzeReport, SplitError>;

    /// Split a bucket PDF with a stored analysis.
    async fn split(&self, pdf_path: &str, analysis_path: &str) -> Result<SplitReport, SplitError>;

    /// Analyze then split.
    async fn process(&self, pdf_path: &str) -> Result<ProcessReport, SplitError>;

    /// Extract questions or answers from one PDF.
    async fn extract(
        &self,
        pdf_path: &str,
        subject: &str,
        kind: ExtractionKind,
    ) -> Result<ExtractionReport, ExtractError>;

    /// Extract every PDF of a split book folder.
    async fn extract_book_folder(
        &self,
        folder_path: &str,
        subject: &str,
    ) -> Result<FolderReport, ExtractError>;

    /// Accepted subject keys.
    fn subjects(&self) -> SubjectsReport {
        subjects_report()
    }

    /// Ingest a PDF into the book's vector collection.
    async fn ingest(&self, request: IngestRequest) -> Result<IngestReport, IngestError>;

    /// Similarity search over a book's collection.
    async fn search(&self, request: SearchRequest) -> Result<SearchReport, IngestError>;

    /// Every collection with its statistics.
    async fn list_collections(&self) -> Result<CollectionsReport, IngestError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl PipelineService {
    /// Assemble the pipeline from already built services.
    pub fn new(
        split: SplitService,
        extract: ExtractService,
        ingest: IngestService,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            split,
            extract,
            ingest,
            metrics,
        }
    }

    /// Build every collaborator from the loaded configuration.
    pub fn from_config() -> Result<Self, ServiceInitError> {
        let config = get_config();
        let tokens = Arc::new(AccessTokenProvider::from_config(config));
        let metrics = Arc::new(PipelineMetrics::new());

        tracing::info!(bucket = %config.bucket_name, "Initializing storage client");
        let store: Arc<dyn ObjectStore> = Arc::new(GcsClient::new(tokens.clone())?);
        tracing::info!(
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            "Initializing embedding client"
        );
        let embedder = get_embedding_client(tokens.clone())?;
        let model = Arc::new(VertexGenerativeClient::from_config(tokens)?);
        let qdrant = QdrantService::new()?;
        let chunker = SemanticChunker::from_config()?;
        tracing::info!("Pipeline services initialized");

        Ok(Self::new(
            SplitService::new(store.clone(), metrics.clone()),
            ExtractService::new(store.clone(), model, metrics.clone()),
            IngestService::new(
                store,
                embedder,
                qdrant,
                chunker,
                IngestSettings::from_config(config),
                metrics.clone(),
            ),
            metrics,
        ))
    }
}

#[async_trait]
impl PipelineApi for PipelineService {
    async fn analyze(&self, pdf_path: &str) -> Result<AnalyzeReport, SplitError> {
        self.split.analyze(pdf_path).await
    }

    async fn split(&self, pdf_path: &str, analysis_path: &str) -> Result<SplitReport, SplitError> {
        self.split.split(pdf_path, analysis_path).await
    }

    async fn process(&self, pdf_path: &str) -> Result<ProcessReport, SplitError> {
        self.split.process(pdf_path).await
    }

    async fn extract(
        &self,
        pdf_path: &str,
        subject: &str,
        kind: ExtractionKind,
    ) -> Result<ExtractionReport, ExtractError> {
        self.extract.extract(pdf_path, subject, kind).await
    }

    async fn extract_book_folder(
        &self,
        folder_path: &str,
        subject: &str,
    ) -> Result<FolderReport, ExtractError> {
        self.extract.extract_book_folder(folder_path, subject).await
    }

    async fn ingest(&self, request: IngestRequest) -> Result<IngestReport, IngestError> {
        self.ingest.ingest(request).await
    }

    async fn search(&self, request: SearchRequest) -> Result<SearchReport, IngestError> {
        self.ingest.search(request).await
    }

    async fn list_collections(&self) -> Result<CollectionsReport, IngestError> {
        self.ingest.list_collections().await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
