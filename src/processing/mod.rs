//! Service layer: analyze and split, extraction, and RAG ingestion over the bucket.

mod cache;
pub mod extract;
pub mod ingest;
mod service;
pub mod split;
pub mod types;

pub use extract::{ExtractService, subjects_report};
pub use ingest::{IngestService, IngestSettings};
pub use service::{PipelineApi, PipelineService, ServiceInitError};
pub use split::{SplitService, analyze_local, split_local};
pub use types::{
    AnalyzeReport, CollectionsReport, ExtractError, ExtractionReport, FolderFileResult,
    FolderKindReport, FolderReport, FolderResults, IngestError, IngestReport, IngestRequest,
    ProcessReport, STATUS_SUCCESS, SearchHit, SearchReport, SearchRequest, SplitError,
    SplitReport, SubjectsReport,
};
