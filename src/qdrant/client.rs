//! HTTP client wrapper for interacting with Qdrant.

use crate::config::get_config;
use crate::qdrant::{
    payload::{build_payload, current_timestamp_rfc3339, point_id},
    types::{
        CollectionInfo, CollectionResponse, IndexSummary, ListCollectionsResponse,
        PayloadContext, PointInsert, QdrantError, QueryResponse, QueryResponseResult,
        ScoredPoint,
    },
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, QdrantError> {
        let config = get_config();
        Self::with_base_url(&config.qdrant_url, config.qdrant_api_key.clone())
    }

    /// Construct a client against an explicit Qdrant URL.
    pub fn with_base_url(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("paperslice/0.1").build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::info!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create or update a collection with the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection ensured/created");
        })
        .await
    }

    /// Retrieve the names of all collections present in Qdrant.
    pub async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        let response = self.request(Method::GET, "collections")?.send().await?;

        if response.status().is_success() {
            let payload: ListCollectionsResponse = response.json().await?;
            let names = payload
                .result
                .collections
                .into_iter()
                .map(|collection| collection.name)
                .collect();
            Ok(names)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to list collections");
            Err(error)
        }
    }

    /// Fetch point/segment counts and status for a collection.
    pub async fn collection_info(
        &self,
        collection_name: &str,
    ) -> Result<CollectionInfo, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let CollectionResponse { result } = response.json().await?;
                Ok(CollectionInfo {
                    name: collection_name.to_string(),
                    status: result.status.unwrap_or_else(|| "unknown".to_string()),
                    vectors_count: result.vectors_count.unwrap_or_default(),
                    indexed_vectors_count: result.indexed_vectors_count.unwrap_or_default(),
                    points_count: result.points_count.unwrap_or_default(),
                    segments_count: result.segments_count.unwrap_or_default(),
                })
            }
            StatusCode::NOT_FOUND => Err(QdrantError::CollectionNotFound(
                collection_name.to_string(),
            )),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(
                    collection = collection_name,
                    error = %error,
                    "Failed to fetch collection info"
                );
                Err(error)
            }
        }
    }

    /// Upsert chunk vectors; point ids are derived from the chunk so re-ingestion overwrites.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: Vec<PointInsert>,
        context: &PayloadContext,
    ) -> Result<IndexSummary, QdrantError> {
        if points.is_empty() {
            return Ok(IndexSummary::default());
        }

        let now = current_timestamp_rfc3339();
        let serialized: Vec<_> = points
            .into_iter()
            .map(|point| {
                let id = point_id(collection_name, point.chunk_index, &point.chunk_hash);
                let payload = build_payload(&point, context, &now);
                json!({
                    "id": id,
                    "vector": point.vector,
                    "payload": payload,
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points upserted"
            );
        })
        .await?;

        Ok(IndexSummary {
            upserted: point_count,
        })
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        filter: Option<Value>,
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let mut body = serde_json::Map::new();
        body.insert("query".into(), json!(vector));
        body.insert("limit".into(), json!(limit));
        body.insert("with_payload".into(), Value::Bool(true));

        if let Some(threshold) = score_threshold {
            body.insert("score_threshold".into(), Value::from(threshold));
        }

        if let Some(filter_value) = filter {
            body.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )?
            .json(&Value::Object(body))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(QdrantError::CollectionNotFound(collection_name.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Whether Qdrant knows about `collection_name`.
    pub async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(
                    collection = collection_name,
                    error = %error,
                    "Collection existence check failed"
                );
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

/// Filter matching a single chapter number in the payload.
pub fn chapter_filter(chapter: u32) -> Value {
    json!({
        "must": [
            {
                "key": "chapter_number",
                "match": { "value": chapter }
            }
        ]
    })
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };
    use serde_json::Map;

    fn service(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("paperslice-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: Some("secret".into()),
        }
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/book_physics/points/query")
                    .header("api-key", "secret")
                    .json_body_partial(
                        r#"{"limit": 3, "filter": {"must": [{"key": "chapter_number", "match": {"value": 2}}]}}"#,
                    );
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": "3f1c2f4e-0000-5000-8000-000000000000",
                                "score": 0.82,
                                "payload": {
                                    "content": "Newton's laws",
                                    "chapter_number": 2
                                }
                            }
                        ]
                    }
                }));
            })
            .await;

        let results = service(&server)
            .search_points(
                "book_physics",
                vec![0.1, 0.2],
                Some(chapter_filter(2)),
                3,
                Some(0.7),
            )
            .await
            .expect("search request");

        mock.assert();
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert!((hit.score - 0.82).abs() < f32::EPSILON);
        let payload = hit.payload.as_ref().expect("payload");
        assert_eq!(payload["content"], Value::String("Newton's laws".into()));
    }

    #[tokio::test]
    async fn creates_missing_collection_with_cosine_distance() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/book_physics");
                then.status(404).json_body(json!({ "status": { "error": "Not found" } }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/book_physics")
                    .json_body(json!({ "vectors": { "size": 8, "distance": "Cosine" } }));
                then.status(200).json_body(json!({ "result": true, "status": "ok" }));
            })
            .await;

        service(&server)
            .create_collection_if_not_exists("book_physics", 8)
            .await
            .expect("create");
        exists.assert();
        create.assert();
    }

    #[tokio::test]
    async fn upsert_uses_deterministic_ids_and_chunk_payload() {
        let server = MockServer::start_async().await;
        let expected_id = point_id("book_physics", 0, "hash-0");
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/book_physics/points")
                    .query_param("wait", "true")
                    .body_contains(expected_id.as_str())
                    .body_contains("\"content\":\"Force equals mass times acceleration\"")
                    .body_contains("\"book_name\":\"Physics\"");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let summary = service(&server)
            .upsert_points(
                "book_physics",
                vec![PointInsert {
                    chunk_index: 0,
                    text: "Force equals mass times acceleration".into(),
                    chunk_hash: "hash-0".into(),
                    vector: vec![0.5, 0.5],
                    metadata: Map::new(),
                }],
                &PayloadContext {
                    book_name: "Physics".into(),
                    chapter_number: None,
                    source_uri: None,
                },
            )
            .await
            .expect("upsert");
        mock.assert();
        assert_eq!(summary.upserted, 1);
    }

    #[tokio::test]
    async fn collection_info_reads_counts() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/book_physics");
                then.status(200).json_body(json!({
                    "result": {
                        "status": "green",
                        "indexed_vectors_count": 0,
                        "points_count": 12,
                        "segments_count": 2,
                        "config": { "params": { "vectors": { "size": 768, "distance": "Cosine" } } }
                    },
                    "status": "ok"
                }));
            })
            .await;

        let info = service(&server)
            .collection_info("book_physics")
            .await
            .expect("info");
        assert_eq!(info.status, "green");
        assert_eq!(info.points_count, 12);
        assert_eq!(info.segments_count, 2);
        assert_eq!(info.vectors_count, 0);
    }

    #[tokio::test]
    async fn collection_info_maps_missing_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/book_missing");
                then.status(404).body("Not found");
            })
            .await;

        let error = service(&server)
            .collection_info("book_missing")
            .await
            .expect_err("missing");
        assert!(matches!(error, QdrantError::CollectionNotFound(name) if name == "book_missing"));
    }

    #[test]
    fn normalize_trims_trailing_slash() {
        let normalized = normalize_base_url("http://localhost:6333/").expect("url");
        assert_eq!(
            format_endpoint(&normalized, "collections"),
            "http://localhost:6333/collections"
        );
    }
}
