//! Heuristic structural analysis: find section markers and turn them into page ranges.

use super::{
    classifier::{MarkerTag, classify_kind, output_target},
    confidence::{NOT_FOUND_CONFIDENCE, boundary_confidence, document_confidence},
    patterns::{MarkerCandidate, best_candidate},
    result::{AnalysisResult, BoundaryKind, ChapterBoundary},
};
use crate::pdf::{DocumentText, PdfDocument, PdfError};
use std::path::Path;

const HEADER_PERCENT: usize = 20;
const MIN_HEADER_LINES: usize = 3;

/// A marker located on a specific page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMarker {
    /// 1-based page number.
    pub page: u32,
    /// Winning candidate for the page.
    pub candidate: MarkerCandidate,
}

/// Scans page headers for section markers and derives chapter boundaries.
#[derive(Debug, Clone)]
pub struct PdfAnalyzer {
    header_percent: usize,
    min_header_lines: usize,
}

impl Default for PdfAnalyzer {
    fn default() -> Self {
        Self {
            header_percent: HEADER_PERCENT,
            min_header_lines: MIN_HEADER_LINES,
        }
    }
}

impl PdfAnalyzer {
    /// Analyzer with the default header window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Leading lines of a page treated as its header.
    ///
    /// The window is a fraction of the page's non-empty lines, rounded up, with a floor of a
    /// few lines so sparse pages still expose their title.
    pub fn header_region(&self, page_text: &str) -> String {
        let lines: Vec<&str> = page_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let window = (lines.len() * self.header_percent)
            .div_ceil(100)
            .max(self.min_header_lines);
        lines
            .into_iter()
            .take(window)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Best marker for each page that has one, in page order.
    pub fn find_markers(&self, text: &DocumentText) -> Vec<PageMarker> {
        text.pages
            .iter()
            .enumerate()
            .filter_map(|(index, page_text)| {
                let header = self.header_region(page_text);
                best_candidate(&header).map(|candidate| PageMarker {
                    page: index as u32 + 1,
                    candidate,
                })
            })
            .collect()
    }

    /// Analyze already extracted page text.
    pub fn analyze_text(&self, source: &str, text: &DocumentText) -> AnalysisResult {
        let total_pages = text.page_count();
        let book_title = text.book_title();
        let markers = self.find_markers(text);

        let boundaries = if markers.is_empty() {
            whole_document(&book_title, total_pages)
        } else {
            build_boundaries(&markers, total_pages)
        };
        let confidence = document_confidence(
            markers.iter().map(|marker| marker.candidate.label.as_str()),
            total_pages,
        );

        tracing::info!(
            source,
            total_pages,
            markers = markers.len(),
            boundaries = boundaries.len(),
            confidence,
            "Analyzed document structure"
        );

        AnalysisResult {
            source: source.to_string(),
            book_title,
            total_pages,
            confidence,
            boundaries,
        }
    }

    /// Analyze a parsed document.
    pub fn analyze_document(&self, source: &str, document: &PdfDocument) -> AnalysisResult {
        self.analyze_text(source, &document.text())
    }

    /// Parse and analyze PDF bytes.
    pub fn analyze_bytes(&self, source: &str, bytes: &[u8]) -> Result<AnalysisResult, PdfError> {
        let document = PdfDocument::from_bytes(bytes)?;
        Ok(self.analyze_document(source, &document))
    }

    /// Read and analyze a local PDF.
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisResult, PdfError> {
        let document = PdfDocument::open(path)?;
        Ok(self.analyze_document(&path.display().to_string(), &document))
    }
}

fn build_boundaries(markers: &[PageMarker], total_pages: u32) -> Vec<ChapterBoundary> {
    markers
        .iter()
        .enumerate()
        .map(|(index, marker)| {
            let end_page = markers
                .get(index + 1)
                .map(|next| next.page - 1)
                .unwrap_or(total_pages);
            let label = marker.candidate.label.clone();
            let tag = MarkerTag::from_label(&label);
            let target = output_target(&label, tag);
            let kind = classify_kind(&label, tag, marker.candidate.family, target.as_ref());
            let confidence = boundary_confidence(
                marker.candidate.family,
                tag != MarkerTag::None,
                target.is_some(),
            );

            ChapterBoundary {
                kind,
                tag: tag.as_str().to_string(),
                start_page: marker.page,
                end_page,
                confidence,
                pdf_filename: target.as_ref().map(|target| target.filename.clone()),
                pdf_folder: target.as_ref().map(|target| target.folder.to_string()),
                label,
            }
        })
        .collect()
}

fn whole_document(book_title: &str, total_pages: u32) -> Vec<ChapterBoundary> {
    if total_pages == 0 {
        return Vec::new();
    }
    vec![ChapterBoundary {
        label: book_title.to_string(),
        kind: BoundaryKind::Unknown,
        tag: MarkerTag::None.as_str().to_string(),
        start_page: 1,
        end_page: total_pages,
        confidence: NOT_FOUND_CONFIDENCE,
        pdf_filename: None,
        pdf_folder: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ANSWER_KEYS_FOLDER, QUESTION_PAPERS_FOLDER};
    use crate::pdf::build_text_pdf;

    fn document(pages: &[&str]) -> DocumentText {
        DocumentText {
            metadata_title: Some("Computer Applications Sample Papers".into()),
            pages: pages.iter().map(|page| page.to_string()).collect(),
        }
    }

    #[test]
    fn header_region_uses_fraction_with_floor() {
        let analyzer = PdfAnalyzer::new();
        let page = (1..=20)
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        let header = analyzer.header_region(&page);
        assert_eq!(header.lines().count(), 4);
        assert_eq!(analyzer.header_region("a\nb\nc\nd\ne").lines().count(), 3);
    }

    #[test]
    fn markers_below_header_are_ignored() {
        let analyzer = PdfAnalyzer::new();
        let text = document(&["Intro\nMore\nEven more\nStill more\nUNSOLVED SQP-1"]);
        assert!(analyzer.find_markers(&text).is_empty());
    }

    #[test]
    fn builds_ranges_between_markers() {
        let analyzer = PdfAnalyzer::new();
        let text = document(&[
            "Contents\nPreface",
            "UNSOLVED Sample Question Paper-1\nSection A",
            "Q5. Write a program",
            "SOLUTIONS Sample Question Paper-1\nAnswer 1",
            "Answer 6",
            "UNSOLVED Self Assessment Paper-2\nTime allowed",
        ]);
        let result = analyzer.analyze_text("book.pdf", &text);

        assert_eq!(result.total_pages, 6);
        assert_eq!(result.boundaries.len(), 3);
        assert!(result.validate().is_ok());

        let first = &result.boundaries[0];
        assert_eq!((first.start_page, first.end_page), (2, 3));
        assert_eq!(first.kind, BoundaryKind::QuestionPaper);
        assert_eq!(first.tag, "UNSOLVED");
        assert_eq!(first.pdf_filename.as_deref(), Some("SQP-1.pdf"));
        assert_eq!(first.pdf_folder.as_deref(), Some(QUESTION_PAPERS_FOLDER));

        let second = &result.boundaries[1];
        assert_eq!((second.start_page, second.end_page), (4, 5));
        assert_eq!(second.kind, BoundaryKind::AnswerKey);
        assert_eq!(second.pdf_filename.as_deref(), Some("SQP-1-SOLUTION.pdf"));
        assert_eq!(second.pdf_folder.as_deref(), Some(ANSWER_KEYS_FOLDER));

        let third = &result.boundaries[2];
        assert_eq!((third.start_page, third.end_page), (6, 6));
        assert_eq!(third.pdf_filename.as_deref(), Some("SAP-2.pdf"));
        assert!((third.confidence - 1.0).abs() < 1e-6);

        assert!((result.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn untagged_paper_stays_unwritten_but_classified() {
        let analyzer = PdfAnalyzer::new();
        let result = analyzer.analyze_text("book.pdf", &document(&["Mind Map-1", "SQP-4"]));
        assert_eq!(result.boundaries[0].kind, BoundaryKind::Unknown);
        assert_eq!(result.boundaries[1].kind, BoundaryKind::QuestionPaper);
        assert!(result.boundaries[1].pdf_filename.is_none());
        assert_eq!(result.splittable().count(), 0);
    }

    #[test]
    fn no_markers_yields_single_unknown_boundary() {
        let analyzer = PdfAnalyzer::new();
        let result = analyzer.analyze_text("notes.pdf", &document(&["Hello", "World", "!"]));
        assert_eq!(result.boundaries.len(), 1);
        let only = &result.boundaries[0];
        assert_eq!(only.label, "Computer Applications Sample Papers");
        assert_eq!(only.kind, BoundaryKind::Unknown);
        assert_eq!((only.start_page, only.end_page), (1, 3));
        assert!((only.confidence - NOT_FOUND_CONFIDENCE).abs() < 1e-6);
        assert!((result.confidence - NOT_FOUND_CONFIDENCE).abs() < 1e-6);
    }

    #[test]
    fn empty_document_has_no_boundaries() {
        let result = PdfAnalyzer::new().analyze_text("empty.pdf", &DocumentText::default());
        assert_eq!(result.total_pages, 0);
        assert!(result.boundaries.is_empty());
        assert_eq!(result.book_title, crate::pdf::UNKNOWN_TITLE);
    }

    #[test]
    fn analyzes_pdf_bytes() {
        let bytes = build_text_pdf(
            Some("Sample Papers"),
            &[
                &["Contents"],
                &["UNSOLVED SQP-1", "Section A"],
                &["Q1"],
                &["SOLUTIONS SQP-1", "Answers"],
            ],
        );
        let result = PdfAnalyzer::new()
            .analyze_bytes("gs://bucket/sample.pdf", &bytes)
            .expect("analyze");
        assert_eq!(result.source, "gs://bucket/sample.pdf");
        assert_eq!(result.book_title, "Sample Papers");
        let files: Vec<_> = result
            .splittable()
            .filter_map(|boundary| boundary.pdf_filename.as_deref())
            .collect();
        assert_eq!(files, vec!["SQP-1.pdf", "SQP-1-SOLUTION.pdf"]);
    }
}
