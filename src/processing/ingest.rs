//! RAG ingestion: PDF to markdown to chunks to vectors in Qdrant, plus similarity search.

use super::cache::{self, CacheMetadata};
use super::types::{
    CollectionsReport, IngestError, IngestReport, IngestRequest, STATUS_SUCCESS, SearchHit,
    SearchReport, SearchRequest,
};
use crate::{
    chunking::{Chunk, SemanticChunker},
    config::Config,
    embedding::EmbeddingClient,
    metrics::PipelineMetrics,
    pdf::{PdfDocument, document_to_markdown, pages_to_markdown},
    qdrant::{
        PayloadContext, PointInsert, QdrantError, QdrantService, ScoredPoint, book_slug,
        chapter_filter, collection_name, compute_chunk_hash,
    },
    storage::{GcsPath, ObjectStore, embeddings_cache_object, markdown_object},
};
use serde_json::{Map, Value};
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const MARKDOWN_CONTENT_TYPE: &str = "text/markdown";

/// Vector size and search defaults used by [`IngestService`].
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    /// Dimension of every stored vector.
    pub vector_size: usize,
    /// Hits returned when a search names no limit.
    pub default_limit: usize,
    /// Minimum score when a search names no threshold.
    pub default_score_threshold: f32,
}

impl IngestSettings {
    /// Settings taken from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            vector_size: config.embedding_dimension,
            default_limit: config.search_default_limit,
            default_score_threshold: config.search_default_score_threshold,
        }
    }
}

/// Converts book PDFs into searchable Qdrant collections.
pub struct IngestService {
    store: Arc<dyn ObjectStore>,
    embedder: Arc<dyn EmbeddingClient>,
    qdrant: QdrantService,
    chunker: SemanticChunker,
    settings: IngestSettings,
    metrics: Arc<PipelineMetrics>,
}

impl IngestService {
    /// Assemble the service from its collaborators.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        embedder: Arc<dyn EmbeddingClient>,
        qdrant: QdrantService,
        chunker: SemanticChunker,
        settings: IngestSettings,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            embedder,
            qdrant,
            chunker,
            settings,
            metrics,
        }
    }

    /// Ingest one PDF (or a page range of it) into the book's collection.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport, IngestError> {
        let collection = collection_name(&request.book_name, request.chapter);
        tracing::info!(
            pdf = %request.pdf_path,
            book = %request.book_name,
            chapter = ?request.chapter,
            collection = %collection,
            "Ingesting PDF"
        );
        if !request.update_existing {
            self.reject_populated(&collection).await?;
        }

        let source = self.store.resolve(&request.pdf_path)?;
        let bytes = self.store.download(&source).await?;
        let text = PdfDocument::from_bytes(&bytes)?.text();
        let markdown = match (request.start_page, request.end_page) {
            (None, None) => document_to_markdown(&text),
            (start, end) => pages_to_markdown(
                &text,
                start.unwrap_or(1),
                end.unwrap_or_else(|| text.page_count()),
            ),
        };

        let markdown_path =
            source.with_object(markdown_object(request.book_name.trim(), request.chapter));
        self.store
            .upload(&markdown_path, markdown.clone().into_bytes(), MARKDOWN_CONTENT_TYPE)
            .await?;

        let chunks = self.chunker.chunk_markdown(&markdown, request.chapter);
        if chunks.is_empty() {
            return Err(IngestError::NoChunks);
        }
        tracing::info!(collection = %collection, chunks = chunks.len(), "Chunked markdown");

        let cache_path = source.with_object(embeddings_cache_object(
            &book_slug(&request.book_name),
            request.chapter,
        ));
        let (embeddings, cached) = self.embeddings_for(&request, &chunks, &cache_path).await?;
        self.check_dimensions(&embeddings)?;

        self.qdrant
            .create_collection_if_not_exists(&collection, self.settings.vector_size as u64)
            .await?;
        let points: Vec<PointInsert> = chunks
            .iter()
            .zip(embeddings.iter())
            .map(|(chunk, vector)| PointInsert {
                chunk_index: chunk.chunk_index,
                text: chunk.content.clone(),
                chunk_hash: compute_chunk_hash(&chunk.content),
                vector: vector.clone(),
                metadata: chunk_metadata(chunk),
            })
            .collect();
        let context = PayloadContext {
            book_name: request.book_name.clone(),
            chapter_number: request.chapter,
            source_uri: Some(source.to_string()),
        };
        let summary = self.qdrant.upsert_points(&collection, points, &context).await?;
        let collection_info = self.qdrant.collection_info(&collection).await?;
        self.metrics.record_ingest(summary.upserted as u64);
        tracing::info!(
            collection = %collection,
            upserted = summary.upserted,
            cached,
            "Ingestion complete"
        );

        Ok(IngestReport {
            status: STATUS_SUCCESS,
            book_name: request.book_name,
            chapter: request.chapter,
            collection_name: collection,
            chunks_created: chunks.len(),
            embeddings_generated: embeddings.len(),
            embeddings_cached: cached,
            markdown_gcs_path: markdown_path.to_string(),
            collection_info,
        })
    }

    /// Search a book (or one chapter of it) for chunks similar to the query.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchReport, IngestError> {
        let collection = collection_name(&request.book_name, request.chapter);
        let limit = request.limit.unwrap_or(self.settings.default_limit);
        let threshold = request
            .score_threshold
            .unwrap_or(self.settings.default_score_threshold);
        tracing::info!(collection = %collection, limit, threshold, "Searching");

        let vector = self.embedder.generate_query_embedding(&request.query).await?;
        self.check_dimensions(std::slice::from_ref(&vector))?;
        let points = self
            .qdrant
            .search_points(
                &collection,
                vector,
                request.chapter.map(chapter_filter),
                limit,
                Some(threshold),
            )
            .await?;
        let results: Vec<SearchHit> = points.into_iter().map(search_hit).collect();
        tracing::info!(collection = %collection, hits = results.len(), "Search complete");

        Ok(SearchReport {
            status: STATUS_SUCCESS,
            query: request.query,
            book_name: request.book_name,
            chapter: request.chapter,
            collection_name: collection,
            total_results: results.len(),
            results,
        })
    }

    /// Every collection with its statistics.
    pub async fn list_collections(&self) -> Result<CollectionsReport, IngestError> {
        let mut collections = Vec::new();
        for name in self.qdrant.list_collections().await? {
            match self.qdrant.collection_info(&name).await {
                Ok(info) => collections.push(info),
                Err(QdrantError::CollectionNotFound(name)) => {
                    tracing::warn!(collection = %name, "Collection disappeared while listing");
                }
                Err(error) => return Err(error.into()),
            }
        }
        Ok(CollectionsReport {
            status: STATUS_SUCCESS,
            total_collections: collections.len(),
            collections,
        })
    }

    async fn reject_populated(&self, collection: &str) -> Result<(), IngestError> {
        match self.qdrant.collection_info(collection).await {
            Ok(info) if info.points_count > 0 => {
                tracing::warn!(
                    collection,
                    points = info.points_count,
                    "Refusing to update populated collection"
                );
                Err(IngestError::CollectionExists(collection.to_string()))
            }
            Ok(_) | Err(QdrantError::CollectionNotFound(_)) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    async fn embeddings_for(
        &self,
        request: &IngestRequest,
        chunks: &[Chunk],
        cache_path: &GcsPath,
    ) -> Result<(Vec<Vec<f32>>, bool), IngestError> {
        let hash = cache::content_hash(chunks);
        if let Some(embeddings) =
            cache::load(self.store.as_ref(), cache_path, &hash, self.settings.vector_size).await
            && embeddings.len() == chunks.len()
        {
            return Ok((embeddings, true));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let embeddings = self.embedder.generate_embeddings(texts).await?;
        let metadata = CacheMetadata {
            book_name: request.book_name.clone(),
            chapter: request.chapter,
            created_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            content_hash: hash,
            chunk_count: chunks.len(),
            embedding_dimension: self.settings.vector_size,
        };
        cache::save(self.store.as_ref(), cache_path, metadata, chunks, &embeddings).await;
        Ok((embeddings, false))
    }

    fn check_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<(), IngestError> {
        let expected = self.settings.vector_size;
        match embeddings.iter().find(|vector| vector.len() != expected) {
            Some(vector) => Err(IngestError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            None => Ok(()),
        }
    }
}

fn chunk_metadata(chunk: &Chunk) -> Map<String, Value> {
    let mut metadata = match serde_json::to_value(&chunk.metadata) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    metadata.insert("section_title".into(), Value::from(chunk.section_title.clone()));
    metadata.insert("section_level".into(), Value::from(chunk.section_level));
    metadata.insert("token_count".into(), Value::from(chunk.token_count));
    metadata.insert("start_position".into(), Value::from(chunk.start_position));
    metadata.insert("end_position".into(), Value::from(chunk.end_position));
    metadata
}

fn search_hit(point: ScoredPoint) -> SearchHit {
    let mut metadata = point.payload.unwrap_or_default();
    let content = match metadata.remove("content") {
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    SearchHit {
        id: point.id,
        score: point.score,
        content,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::whitespace_counter;
    use crate::embedding::HashedEmbeddingClient;
    use crate::pdf::build_text_pdf;
    use crate::storage::memory::MemoryStore;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::json;

    const DIMENSION: usize = 8;

    fn settings() -> IngestSettings {
        IngestSettings {
            vector_size: DIMENSION,
            default_limit: 5,
            default_score_threshold: 0.5,
        }
    }

    fn service(store: Arc<MemoryStore>, server: &MockServer) -> IngestService {
        IngestService::new(
            store,
            Arc::new(HashedEmbeddingClient::new(DIMENSION)),
            QdrantService::with_base_url(&server.base_url(), None).expect("qdrant"),
            SemanticChunker::with_counter(64, 8, 4, whitespace_counter()).expect("chunker"),
            settings(),
            Arc::new(PipelineMetrics::new()),
        )
    }

    fn book_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        store.insert(
            GcsPath::new("test-bucket", "uploads/physics.pdf"),
            build_text_pdf(
                Some("Physics"),
                &[
                    &["Motion", "Force equals mass times acceleration in every frame."],
                    &["Energy", "Work done on a body changes its kinetic energy."],
                ],
            ),
        );
        store
    }

    fn request(update_existing: bool) -> IngestRequest {
        IngestRequest {
            pdf_path: "gs://test-bucket/uploads/physics.pdf".into(),
            book_name: "Physics Book".into(),
            chapter: Some(2),
            start_page: None,
            end_page: None,
            update_existing,
        }
    }

    async fn mock_collection(server: &MockServer, points: u64) {
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/collections/book_physics_book_chapter_2");
                then.status(200).json_body(json!({
                    "result": { "status": "green", "points_count": points, "segments_count": 1 },
                    "status": "ok"
                }));
            })
            .await;
    }

    #[tokio::test]
    async fn ingest_writes_markdown_cache_and_points() {
        let server = MockServer::start_async().await;
        mock_collection(&server, 0).await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/book_physics_book_chapter_2/points")
                    .body_contains("\"book_name\":\"Physics Book\"")
                    .body_contains("\"chapter_number\":2")
                    .body_contains("\"source_uri\":\"gs://test-bucket/uploads/physics.pdf\"");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;
        let store = book_store();

        let report = service(store.clone(), &server)
            .ingest(request(false))
            .await
            .expect("ingest");

        upsert.assert();
        assert_eq!(report.collection_name, "book_physics_book_chapter_2");
        assert!(report.chunks_created > 0);
        assert_eq!(report.embeddings_generated, report.chunks_created);
        assert!(!report.embeddings_cached);
        assert_eq!(
            report.markdown_gcs_path,
            "gs://test-bucket/books/Physics Book/chapter_02.md"
        );
        let markdown = store
            .get(&GcsPath::new("test-bucket", "books/Physics Book/chapter_02.md"))
            .expect("markdown");
        assert!(String::from_utf8_lossy(&markdown).contains("_page_2_"));
        assert!(
            store
                .names()
                .contains(&"embeddings/physics_book/chapter_02.json".to_string())
        );
    }

    #[tokio::test]
    async fn second_ingest_reuses_cached_embeddings() {
        let server = MockServer::start_async().await;
        mock_collection(&server, 0).await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/book_physics_book_chapter_2/points");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;
        let service = service(book_store(), &server);

        service.ingest(request(true)).await.expect("first");
        let second = service.ingest(request(true)).await.expect("second");
        assert!(second.embeddings_cached);
    }

    #[tokio::test]
    async fn populated_collection_is_rejected_without_update_flag() {
        let server = MockServer::start_async().await;
        mock_collection(&server, 12).await;

        let error = service(book_store(), &server)
            .ingest(request(false))
            .await
            .expect_err("populated");
        assert!(matches!(
            error,
            IngestError::CollectionExists(name) if name == "book_physics_book_chapter_2"
        ));
    }

    #[tokio::test]
    async fn search_targets_chapter_collection_and_splits_content() {
        let server = MockServer::start_async().await;
        let query = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/book_physics_book_chapter_2/points/query")
                    .json_body_partial(r#"{"limit": 5, "score_threshold": 0.5}"#)
                    .body_contains("chapter_number");
                then.status(200).json_body(json!({
                    "result": { "points": [{
                        "id": 7,
                        "score": 0.91,
                        "payload": {
                            "content": "Force equals mass times acceleration",
                            "chunk_index": 0
                        }
                    }]}
                }));
            })
            .await;

        let report = service(book_store(), &server)
            .search(SearchRequest {
                query: "What is force?".into(),
                book_name: "Physics Book".into(),
                chapter: Some(2),
                limit: None,
                score_threshold: None,
            })
            .await
            .expect("search");

        query.assert();
        assert_eq!(report.total_results, 1);
        let hit = &report.results[0];
        assert_eq!(hit.id, "7");
        assert_eq!(hit.content, "Force equals mass times acceleration");
        assert!(!hit.metadata.contains_key("content"));
        assert_eq!(hit.metadata["chunk_index"], 0);
    }

    #[tokio::test]
    async fn list_collections_reports_info_for_each() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections");
                then.status(200).json_body(json!({
                    "result": {
                        "collections": [{ "name": "book_physics" }, { "name": "book_gone" }]
                    }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/book_physics");
                then.status(200)
                    .json_body(json!({ "result": { "status": "green", "points_count": 3 } }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/book_gone");
                then.status(404).body("Not found");
            })
            .await;

        let report = service(book_store(), &server)
            .list_collections()
            .await
            .expect("list");
        assert_eq!(report.total_collections, 1);
        assert_eq!(report.collections[0].name, "book_physics");
        assert_eq!(report.collections[0].points_count, 3);
    }
}
