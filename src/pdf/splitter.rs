//! Write analyzed page ranges out as standalone PDFs.

use super::reader::{PdfDocument, PdfError};
use crate::analysis::{
    ANSWER_KEYS_FOLDER, AnalysisResult, ChapterBoundary, QUESTION_PAPERS_FOLDER,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Report entry for one written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitFile {
    /// Output file name, e.g. `SQP-1.pdf`.
    pub filename: String,
    /// Output folder, `question_papers` or `answer_keys`.
    pub folder: String,
    /// Local path or `gs://` URI of the written file.
    pub path: String,
    /// Inclusive page range in the source, formatted `S-E`.
    pub pages: String,
    /// Pages copied into the file.
    pub page_count: u32,
    /// Marker label of the boundary.
    pub label: String,
}

/// One extracted range, held in memory until it is persisted.
#[derive(Debug, Clone)]
pub struct SplitPart {
    /// Marker label of the boundary.
    pub label: String,
    /// Output file name.
    pub filename: String,
    /// Output folder.
    pub folder: String,
    /// First source page.
    pub start_page: u32,
    /// Last source page after clamping to the document.
    pub end_page: u32,
    /// Encoded PDF bytes.
    pub bytes: Vec<u8>,
}

impl SplitPart {
    /// Relative object path `{folder}/{filename}`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.folder, self.filename)
    }

    /// Build the report entry once the part has been written to `path`.
    pub fn report(&self, path: String) -> SplitFile {
        SplitFile {
            filename: self.filename.clone(),
            folder: self.folder.clone(),
            path,
            pages: format!("{}-{}", self.start_page, self.end_page),
            page_count: self.end_page - self.start_page + 1,
            label: self.label.clone(),
        }
    }
}

/// Extract every splittable boundary of `analysis` from `document`.
///
/// Boundaries without a file name, with an unknown folder, or with pages outside the
/// document are skipped with a warning. A failing boundary never aborts the rest.
pub fn split_document(document: &PdfDocument, analysis: &AnalysisResult) -> Vec<SplitPart> {
    let total = document.page_count();
    let mut parts = Vec::new();

    for boundary in &analysis.boundaries {
        let Some((filename, folder)) = output_of(boundary) else {
            continue;
        };
        let Some((start, end)) = page_span(boundary, total) else {
            tracing::warn!(
                label = %boundary.label,
                start = boundary.start_page,
                end = boundary.end_page,
                total,
                "Skipping boundary with invalid page numbers"
            );
            continue;
        };

        match document.extract_range(start, end) {
            Ok(bytes) => {
                tracing::debug!(label = %boundary.label, filename, start, end, "Extracted range");
                parts.push(SplitPart {
                    label: boundary.label.clone(),
                    filename: filename.to_string(),
                    folder: folder.to_string(),
                    start_page: start,
                    end_page: end,
                    bytes,
                });
            }
            Err(err) => {
                tracing::warn!(label = %boundary.label, error = %err, "Failed to extract range");
            }
        }
    }

    parts
}

/// Split into `output_dir/{folder}/{filename}` on the local filesystem.
///
/// A part that cannot be written is logged and skipped; the rest are still written.
pub fn split_to_dir(
    document: &PdfDocument,
    analysis: &AnalysisResult,
    output_dir: &Path,
) -> Vec<SplitFile> {
    let mut files = Vec::new();
    for part in split_document(document, analysis) {
        match write_part(&part, output_dir) {
            Ok(path) => {
                tracing::info!(
                    path = %path.display(),
                    pages = part.end_page - part.start_page + 1,
                    "Wrote split PDF"
                );
                files.push(part.report(path.display().to_string()));
            }
            Err(err) => {
                tracing::error!(label = %part.label, error = %err, "Failed to write split PDF");
            }
        }
    }
    files
}

fn write_part(part: &SplitPart, output_dir: &Path) -> Result<PathBuf, PdfError> {
    let folder = output_dir.join(&part.folder);
    std::fs::create_dir_all(&folder).map_err(|source| PdfError::Io {
        path: folder.display().to_string(),
        source,
    })?;
    let path = folder.join(&part.filename);
    std::fs::write(&path, &part.bytes).map_err(|source| PdfError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(path)
}

fn output_of(boundary: &ChapterBoundary) -> Option<(&str, &str)> {
    let (Some(filename), Some(folder)) = (
        boundary.pdf_filename.as_deref(),
        boundary.pdf_folder.as_deref(),
    ) else {
        tracing::debug!(label = %boundary.label, "Skipping boundary without output file");
        return None;
    };
    if folder != QUESTION_PAPERS_FOLDER && folder != ANSWER_KEYS_FOLDER {
        tracing::warn!(label = %boundary.label, folder, "Skipping boundary with unknown folder");
        return None;
    }
    Some((filename, folder))
}

fn page_span(boundary: &ChapterBoundary, total: u32) -> Option<(u32, u32)> {
    let start = boundary.start_page;
    let end = boundary.end_page.min(total);
    (start >= 1 && start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::BoundaryKind;
    use crate::pdf::build_text_pdf;

    fn boundary(label: &str, start: u32, end: u32, file: Option<(&str, &str)>) -> ChapterBoundary {
        ChapterBoundary {
            label: label.into(),
            kind: BoundaryKind::QuestionPaper,
            tag: "UNSOLVED".into(),
            start_page: start,
            end_page: end,
            confidence: 0.9,
            pdf_filename: file.map(|(name, _)| name.to_string()),
            pdf_folder: file.map(|(_, folder)| folder.to_string()),
        }
    }

    fn analysis(boundaries: Vec<ChapterBoundary>) -> AnalysisResult {
        AnalysisResult {
            source: "book.pdf".into(),
            book_title: "Book".into(),
            total_pages: 5,
            confidence: 0.8,
            boundaries,
        }
    }

    fn five_pages() -> PdfDocument {
        let bytes = build_text_pdf(None, &[&["p1"], &["p2"], &["p3"], &["p4"], &["p5"]]);
        PdfDocument::from_bytes(&bytes).expect("parse")
    }

    #[test]
    fn writes_files_into_folders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let analysis = analysis(vec![
            boundary("UNSOLVED SQP-1", 2, 3, Some(("SQP-1.pdf", QUESTION_PAPERS_FOLDER))),
            boundary(
                "SOLUTIONS SQP-1",
                4,
                5,
                Some(("SQP-1-SOLUTION.pdf", ANSWER_KEYS_FOLDER)),
            ),
        ]);

        let files = split_to_dir(&five_pages(), &analysis, dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].pages, "2-3");
        assert_eq!(files[1].folder, ANSWER_KEYS_FOLDER);
        let written = dir.path().join(ANSWER_KEYS_FOLDER).join("SQP-1-SOLUTION.pdf");
        assert!(written.exists());
        let reread = PdfDocument::open(&written).expect("reopen");
        assert_eq!(reread.page_count(), 2);
    }

    #[test]
    fn skips_unusable_boundaries_and_clamps_end() {
        let analysis = analysis(vec![
            boundary("Mind Map-1", 1, 1, None),
            boundary("Odd", 2, 2, Some(("odd.pdf", "misc"))),
            boundary("Broken", 0, 2, Some(("broken.pdf", QUESTION_PAPERS_FOLDER))),
            boundary("UNSOLVED PP-1", 4, 9, Some(("PP-1.pdf", QUESTION_PAPERS_FOLDER))),
        ]);

        let parts = split_document(&five_pages(), &analysis);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].relative_path(), "question_papers/PP-1.pdf");
        let report = parts[0].report("gs://bucket/book/question_papers/PP-1.pdf".into());
        assert_eq!(report.pages, "4-5");
        assert_eq!(report.page_count, 2);
    }

    #[test]
    fn unwritable_folder_does_not_drop_other_parts() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(QUESTION_PAPERS_FOLDER), b"not a directory")
            .expect("block folder");
        let analysis = analysis(vec![
            boundary("UNSOLVED SQP-1", 2, 3, Some(("SQP-1.pdf", QUESTION_PAPERS_FOLDER))),
            boundary(
                "SOLUTIONS SQP-1",
                4,
                5,
                Some(("SQP-1-SOLUTION.pdf", ANSWER_KEYS_FOLDER)),
            ),
        ]);

        let files = split_to_dir(&five_pages(), &analysis, dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "SQP-1-SOLUTION.pdf");
        assert!(
            dir.path()
                .join(ANSWER_KEYS_FOLDER)
                .join("SQP-1-SOLUTION.pdf")
                .exists()
        );
    }

    #[test]
    fn write_failure_names_the_output_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(ANSWER_KEYS_FOLDER), b"not a directory")
            .expect("block folder");
        let part = SplitPart {
            label: "SOLUTIONS SQP-1".into(),
            filename: "SQP-1-SOLUTION.pdf".into(),
            folder: ANSWER_KEYS_FOLDER.into(),
            start_page: 4,
            end_page: 5,
            bytes: b"%PDF-1.5".to_vec(),
        };

        let error = write_part(&part, dir.path()).expect_err("folder is a file");
        assert!(
            matches!(error, PdfError::Io { ref path, .. } if path.ends_with(ANSWER_KEYS_FOLDER))
        );
        assert!(error.to_string().starts_with("PDF file I/O failed for "));
    }
}
