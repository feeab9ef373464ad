//! HTTP surface for the PDF pipeline.
//!
//! The router exposes the split, extraction, and ingestion operations of [`PipelineApi`]:
//!
//! - `POST /analyze`, `POST /split`, `POST /process` – detect paper boundaries in a bucket PDF
//!   and write the per-paper PDFs.
//! - `POST /extract-questions`, `POST /extract-answers`, `POST /extract-folder`,
//!   `GET /subjects` – pull questions and answers out of split PDFs with a generative model.
//! - `POST /ingest`, `POST /search`, `GET /collections` – chunk and embed a book into Qdrant and
//!   query it.
//! - `GET /health`, `GET /metrics`, `GET /commands` – liveness, counters, and discovery.
//!
//! `pdf_path` and `analysis_path` accept either a string or the nested form a workflow step
//! produces (`{ "pdf_path": { "pdf_path": "gs://..." } }`). Missing fields answer 400 and
//! collaborator failures 500, both with an `{ "error": ... }` body.

use crate::extraction::{DEFAULT_SUBJECT, ExtractionKind};
use crate::processing::{
    ExtractError, IngestError, IngestRequest, PipelineApi, SearchRequest, SplitError,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// Build the HTTP router exposing the pipeline.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/commands", get(get_commands))
        .route("/metrics", get(get_metrics::<S>))
        .route("/analyze", post(analyze::<S>))
        .route("/split", post(split::<S>))
        .route("/process", post(process::<S>))
        .route("/extract-questions", post(extract_questions::<S>))
        .route("/extract-answers", post(extract_answers::<S>))
        .route("/extract-folder", post(extract_folder::<S>))
        .route("/subjects", get(subjects::<S>))
        .route("/ingest", post(ingest::<S>))
        .route("/search", post(search::<S>))
        .route("/collections", get(list_collections::<S>))
        .with_state(service)
}

/// Body of the analyze, split, process, and extraction endpoints.
#[derive(Deserialize)]
struct PdfBody {
    #[serde(default)]
    pdf_path: Option<Value>,
    #[serde(default, alias = "analysis_gcs_path")]
    analysis_path: Option<Value>,
    #[serde(default)]
    subject: Option<String>,
}

/// Body of `POST /extract-folder`.
#[derive(Deserialize)]
struct FolderBody {
    #[serde(default)]
    folder_path: Option<String>,
    #[serde(default)]
    subject: Option<String>,
}

/// Body of `POST /ingest`.
#[derive(Deserialize)]
struct IngestBody {
    #[serde(default)]
    pdf_path: Option<Value>,
    #[serde(default)]
    book_name: Option<String>,
    #[serde(default)]
    chapter: Option<u32>,
    #[serde(default)]
    start_page: Option<u32>,
    #[serde(default)]
    end_page: Option<u32>,
    #[serde(default = "default_update_existing")]
    update_existing: bool,
}

fn default_update_existing() -> bool {
    true
}

/// Body of `POST /search`.
#[derive(Deserialize)]
struct SearchBody {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    book_name: Option<String>,
    #[serde(default)]
    chapter: Option<u32>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    score_threshold: Option<f32>,
}

/// Accept `"path"` or `{ "<key>": "path" }`.
fn path_field(value: Option<&Value>, key: &str) -> Option<String> {
    let text = match value? {
        Value::String(text) => text.as_str(),
        Value::Object(map) => map.get(key)?.as_str()?,
        _ => return None,
    };
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

fn subject_or_default(subject: Option<String>) -> String {
    subject
        .filter(|subject| !subject.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "paperslice",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Analyze a PDF and store its `analysis.json`.
async fn analyze<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<PdfBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let pdf_path = required(
        path_field(body.pdf_path.as_ref(), "pdf_path"),
        "pdf_path is required",
    )?;
    let report = service.analyze(&pdf_path).await?;
    Ok(Json(report).into_response())
}

/// Split a PDF with a previously stored analysis.
async fn split<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<PdfBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let pdf_path = path_field(body.pdf_path.as_ref(), "pdf_path");
    let analysis_path = path_field(body.analysis_path.as_ref(), "analysis_path");
    let (Some(pdf_path), Some(analysis_path)) = (pdf_path, analysis_path) else {
        return Err(AppError::BadRequest(
            "pdf_path and analysis_path are required".to_string(),
        ));
    };
    let report = service.split(&pdf_path, &analysis_path).await?;
    Ok(Json(report).into_response())
}

/// Analyze and split in one call.
async fn process<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<PdfBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let pdf_path = required(
        path_field(body.pdf_path.as_ref(), "pdf_path"),
        "pdf_path is required",
    )?;
    let report = service.process(&pdf_path).await?;
    Ok(Json(report).into_response())
}

async fn extract_questions<S>(
    state: State<Arc<S>>,
    body: Json<PdfBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    extract(state, body, ExtractionKind::Questions).await
}

async fn extract_answers<S>(
    state: State<Arc<S>>,
    body: Json<PdfBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    extract(state, body, ExtractionKind::Answers).await
}

async fn extract<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<PdfBody>,
    kind: ExtractionKind,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let pdf_path = required(
        path_field(body.pdf_path.as_ref(), "pdf_path"),
        "pdf_path is required",
    )?;
    let subject = subject_or_default(body.subject);
    let report = service.extract(&pdf_path, &subject, kind).await?;
    Ok(Json(report).into_response())
}

/// Extract every question paper and answer key of a split book folder.
async fn extract_folder<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<FolderBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let folder_path = required(body.folder_path, "folder_path is required")?;
    let subject = subject_or_default(body.subject);
    let report = service.extract_book_folder(&folder_path, &subject).await?;
    Ok(Json(report).into_response())
}

async fn subjects<S>(State(service): State<Arc<S>>) -> Response
where
    S: PipelineApi,
{
    Json(service.subjects()).into_response()
}

/// Chunk, embed, and index a PDF into its book collection.
async fn ingest<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<IngestBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let pdf_path = path_field(body.pdf_path.as_ref(), "pdf_path");
    let book_name = body.book_name.filter(|name| !name.trim().is_empty());
    let (Some(pdf_path), Some(book_name)) = (pdf_path, book_name) else {
        return Err(AppError::BadRequest(
            "pdf_path and book_name are required".to_string(),
        ));
    };
    let report = service
        .ingest(IngestRequest {
            pdf_path,
            book_name,
            chapter: body.chapter,
            start_page: body.start_page,
            end_page: body.end_page,
            update_existing: body.update_existing,
        })
        .await?;
    tracing::info!(
        collection = %report.collection_name,
        chunks = report.chunks_created,
        "Ingest request completed"
    );
    Ok(Json(report).into_response())
}

/// Similarity search over a book collection.
async fn search<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<SearchBody>,
) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let query = body.query.filter(|query| !query.trim().is_empty());
    let book_name = body.book_name.filter(|name| !name.trim().is_empty());
    let (Some(query), Some(book_name)) = (query, book_name) else {
        return Err(AppError::BadRequest(
            "query and book_name are required".to_string(),
        ));
    };
    let report = service
        .search(SearchRequest {
            query,
            book_name,
            chapter: body.chapter,
            limit: body.limit,
            score_threshold: body.score_threshold,
        })
        .await?;
    Ok(Json(report).into_response())
}

/// List Qdrant collections with their statistics.
async fn list_collections<S>(State(service): State<Arc<S>>) -> Result<Response, AppError>
where
    S: PipelineApi,
{
    let report = service.list_collections().await?;
    Ok(Json(report).into_response())
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Response
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot()).into_response()
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery.
async fn get_commands() -> Json<CommandsResponse> {
    let pdf = json!({ "pdf_path": "gs://bucket/books/sample-papers.pdf" });
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "analyze",
                method: "POST",
                path: "/analyze",
                description: "Detect question paper and answer key boundaries and store {stem}/analysis.json.",
                request_example: Some(pdf.clone()),
            },
            CommandDescriptor {
                name: "split",
                method: "POST",
                path: "/split",
                description: "Write one PDF per boundary of a stored analysis into question_papers/ and answer_keys/.",
                request_example: Some(json!({
                    "pdf_path": "gs://bucket/books/sample-papers.pdf",
                    "analysis_path": "gs://bucket/books/sample-papers/analysis.json"
                })),
            },
            CommandDescriptor {
                name: "process",
                method: "POST",
                path: "/process",
                description: "Analyze and split in one call.",
                request_example: Some(pdf.clone()),
            },
            CommandDescriptor {
                name: "extract_questions",
                method: "POST",
                path: "/extract-questions",
                description: "Extract questions from a question paper with the generative model.",
                request_example: Some(json!({
                    "pdf_path": "gs://bucket/books/sample-papers/question_papers/SQP-1.pdf",
                    "subject": DEFAULT_SUBJECT
                })),
            },
            CommandDescriptor {
                name: "extract_answers",
                method: "POST",
                path: "/extract-answers",
                description: "Extract answers from an answer key with the generative model.",
                request_example: Some(json!({
                    "pdf_path": "gs://bucket/books/sample-papers/answer_keys/SQP-1-SOLUTION.pdf",
                    "subject": DEFAULT_SUBJECT
                })),
            },
            CommandDescriptor {
                name: "extract_folder",
                method: "POST",
                path: "/extract-folder",
                description: "Extract every question paper and answer key of a split book folder.",
                request_example: Some(json!({
                    "folder_path": "books/sample-papers",
                    "subject": DEFAULT_SUBJECT
                })),
            },
            CommandDescriptor {
                name: "subjects",
                method: "GET",
                path: "/subjects",
                description: "List subjects accepted by the extraction endpoints.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/ingest",
                description: "Convert a PDF to markdown, chunk it, embed the chunks, and upsert them into the book collection.",
                request_example: Some(json!({
                    "pdf_path": "gs://bucket/books/physics.pdf",
                    "book_name": "Physics",
                    "chapter": 3,
                    "update_existing": true
                })),
            },
            CommandDescriptor {
                name: "search",
                method: "POST",
                path: "/search",
                description: "Similarity search over a book collection.",
                request_example: Some(json!({
                    "query": "What is Newton's second law?",
                    "book_name": "Physics",
                    "chapter": 3,
                    "limit": 5,
                    "score_threshold": 0.7
                })),
            },
            CommandDescriptor {
                name: "list_collections",
                method: "GET",
                path: "/collections",
                description: "List Qdrant collections with point counts.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters.",
                request_example: None,
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<SplitError> for AppError {
    fn from(inner: SplitError) -> Self {
        tracing::error!(error = %inner, "Split request failed");
        Self::Internal(inner.to_string())
    }
}

impl From<ExtractError> for AppError {
    fn from(inner: ExtractError) -> Self {
        tracing::error!(error = %inner, "Extraction request failed");
        Self::Internal(inner.to_string())
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        tracing::error!(error = %inner, "Ingestion request failed");
        Self::Internal(inner.to_string())
    }
}
