//! Structural analysis of PDFs into labelled page ranges.

mod analyzer;
mod classifier;
mod confidence;
mod patterns;
mod result;

pub use analyzer::{PageMarker, PdfAnalyzer};
pub use classifier::{MarkerTag, OutputTarget, classify_kind, output_target};
pub use confidence::{NOT_FOUND_CONFIDENCE, boundary_confidence, document_confidence};
pub use patterns::{MarkerCandidate, MarkerFamily, best_candidate, is_marker_line};
pub use result::{
    ANSWER_KEYS_FOLDER, AnalysisResult, BoundaryKind, ChapterBoundary, QUESTION_PAPERS_FOLDER,
};
