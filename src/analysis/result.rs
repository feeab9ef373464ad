//! Analysis result types and their JSON contract.
//!
//! The serialized form is what the splitter (and the workflow step after it) consumes. Field
//! aliases keep older `analysis.json` files readable: those used `chapters`,
//! `chapter_name`, `chapter_start_page_number`, `chapter_end_page_number`, and an integer
//! `confidence_score` between 0 and 100.

use serde::{Deserialize, Deserializer, Serialize};

/// Logical category of a detected section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// Question paper (solved or unsolved).
    QuestionPaper,
    /// Answer key or worked solutions.
    AnswerKey,
    /// Section recognized by a marker that does not map to a paper type.
    #[default]
    Unknown,
}

impl BoundaryKind {
    /// Map an output folder name back to a kind.
    pub fn from_folder(folder: &str) -> Self {
        match folder {
            QUESTION_PAPERS_FOLDER => Self::QuestionPaper,
            ANSWER_KEYS_FOLDER => Self::AnswerKey,
            _ => Self::Unknown,
        }
    }
}

/// Folder receiving split question papers.
pub const QUESTION_PAPERS_FOLDER: &str = "question_papers";
/// Folder receiving split answer keys.
pub const ANSWER_KEYS_FOLDER: &str = "answer_keys";

/// A contiguous page range attributed to one logical section of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BoundaryRecord")]
pub struct ChapterBoundary {
    /// Marker text as found on the page.
    pub label: String,
    /// Section category.
    pub kind: BoundaryKind,
    /// Leading tag (`SOLVED`, `UNSOLVED`, `SOLUTIONS`) or `NA`.
    pub tag: String,
    /// First page (1-based, inclusive).
    pub start_page: u32,
    /// Last page (1-based, inclusive).
    pub end_page: u32,
    /// Classifier confidence in `[0, 1]`.
    pub confidence: f32,
    /// File name the splitter writes this range to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_filename: Option<String>,
    /// Folder the splitter writes this range into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_folder: Option<String>,
}

/// Wire form of a boundary, current and legacy field names alike.
#[derive(Deserialize)]
struct BoundaryRecord {
    #[serde(alias = "chapter_name")]
    label: String,
    #[serde(default)]
    kind: Option<BoundaryKind>,
    #[serde(default = "default_tag")]
    tag: String,
    #[serde(alias = "chapter_start_page_number")]
    start_page: u32,
    #[serde(alias = "chapter_end_page_number")]
    end_page: u32,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    pdf_filename: Option<String>,
    #[serde(default)]
    pdf_folder: Option<String>,
}

impl From<BoundaryRecord> for ChapterBoundary {
    fn from(record: BoundaryRecord) -> Self {
        // Legacy files carry no kind; the output folder still says what the range is.
        let kind = record.kind.unwrap_or_else(|| {
            record
                .pdf_folder
                .as_deref()
                .map_or(BoundaryKind::Unknown, BoundaryKind::from_folder)
        });
        Self {
            label: record.label,
            kind,
            tag: record.tag,
            start_page: record.start_page,
            end_page: record.end_page,
            confidence: record.confidence,
            pdf_filename: record.pdf_filename,
            pdf_folder: record.pdf_folder,
        }
    }
}

impl ChapterBoundary {
    /// Number of pages covered by the range.
    pub fn page_count(&self) -> u32 {
        self.end_page.saturating_sub(self.start_page) + 1
    }
}

fn default_tag() -> String {
    "NA".to_string()
}

/// Output of one analyzer run over a single PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Identifier of the analyzed file (local path or `gs://` URI).
    #[serde(default)]
    pub source: String,
    /// Title from the PDF metadata or the first page.
    #[serde(default)]
    pub book_title: String,
    /// Number of pages in the source document.
    #[serde(alias = "book_end_page")]
    pub total_pages: u32,
    /// Document-level confidence in `[0, 1]`.
    #[serde(
        alias = "confidence_score",
        default,
        deserialize_with = "deserialize_confidence"
    )]
    pub confidence: f32,
    /// Ordered, non-overlapping page ranges.
    #[serde(alias = "chapters", default)]
    pub boundaries: Vec<ChapterBoundary>,
}

/// Accept both `0.85` and the legacy percentage form `85`.
fn deserialize_confidence<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f32::deserialize(deserializer)?;
    let normalized = if raw > 1.0 { raw / 100.0 } else { raw };
    Ok(normalized.clamp(0.0, 1.0))
}

impl AnalysisResult {
    /// Check the structural invariants, returning every violation found.
    ///
    /// Ranges must be 1-based, ordered, non-overlapping, and inside `[1, total_pages]`.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.total_pages == 0 && !self.boundaries.is_empty() {
            errors.push("total_pages is 0 but boundaries are present".to_string());
        }

        let mut previous_end: Option<u32> = None;
        for (index, boundary) in self.boundaries.iter().enumerate() {
            if boundary.label.trim().is_empty() {
                errors.push(format!("boundary {index} has an empty label"));
            }
            if boundary.start_page == 0 {
                errors.push(format!("boundary {index} starts at page 0"));
            }
            if boundary.start_page > boundary.end_page {
                errors.push(format!(
                    "boundary {index} start_page ({}) > end_page ({})",
                    boundary.start_page, boundary.end_page
                ));
            }
            if boundary.end_page > self.total_pages {
                errors.push(format!(
                    "boundary {index} ends at page {} beyond total_pages ({})",
                    boundary.end_page, self.total_pages
                ));
            }
            if !(0.0..=1.0).contains(&boundary.confidence) {
                errors.push(format!(
                    "boundary {index} confidence {} outside [0, 1]",
                    boundary.confidence
                ));
            }
            if let Some(end) = previous_end
                && boundary.start_page <= end
            {
                errors.push(format!(
                    "boundary {index} starts at page {} overlapping previous range ending at {end}",
                    boundary.start_page
                ));
            }
            previous_end = Some(boundary.end_page);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Boundaries the splitter can write, i.e. those with a file name and folder.
    pub fn splittable(&self) -> impl Iterator<Item = &ChapterBoundary> {
        self.boundaries
            .iter()
            .filter(|boundary| boundary.pdf_filename.is_some() && boundary.pdf_folder.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boundary(label: &str, start: u32, end: u32) -> ChapterBoundary {
        ChapterBoundary {
            label: label.into(),
            kind: BoundaryKind::QuestionPaper,
            tag: "UNSOLVED".into(),
            start_page: start,
            end_page: end,
            confidence: 0.9,
            pdf_filename: Some(format!("{label}.pdf")),
            pdf_folder: Some(QUESTION_PAPERS_FOLDER.into()),
        }
    }

    #[test]
    fn validate_accepts_ordered_disjoint_ranges() {
        let result = AnalysisResult {
            source: "book.pdf".into(),
            book_title: "Book".into(),
            total_pages: 10,
            confidence: 0.8,
            boundaries: vec![boundary("SQP-1", 2, 5), boundary("SQP-2", 6, 10)],
        };
        assert!(result.validate().is_ok());
    }

    #[test]
    fn validate_reports_overlap_and_out_of_range() {
        let result = AnalysisResult {
            source: "book.pdf".into(),
            book_title: "Book".into(),
            total_pages: 8,
            confidence: 0.8,
            boundaries: vec![boundary("SQP-1", 2, 5), boundary("SQP-2", 5, 9)],
        };
        let errors = result.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("overlapping")));
        assert!(errors.iter().any(|e| e.contains("beyond total_pages")));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let value = serde_json::to_value(boundary("SQP-1", 1, 2)).expect("serialize");
        assert_eq!(value["kind"], "question_paper");
        assert_eq!(value["start_page"], 1);
    }

    #[test]
    fn legacy_analysis_json_is_accepted() {
        let legacy = json!({
            "confidence_score": 85,
            "book_title": "Computer Applications",
            "book_start_page": 1,
            "book_end_page": 40,
            "chapters": [
                {
                    "chapter_name": "UNSOLVED Sample Question Paper-1",
                    "tag": "UNSOLVED",
                    "chapter_start_page_number": 3,
                    "chapter_end_page_number": 9,
                    "pdf_filename": "SQP-1.pdf",
                    "pdf_folder": "question_papers"
                }
            ]
        });
        let result: AnalysisResult = serde_json::from_value(legacy).expect("legacy parse");
        assert_eq!(result.total_pages, 40);
        assert!((result.confidence - 0.85).abs() < f32::EPSILON);
        assert_eq!(result.boundaries[0].label, "UNSOLVED Sample Question Paper-1");
        assert_eq!(result.boundaries[0].start_page, 3);
        assert_eq!(result.boundaries[0].kind, BoundaryKind::QuestionPaper);
        assert_eq!(result.splittable().count(), 1);
    }

    #[test]
    fn missing_kind_follows_output_folder() {
        let parse = |folder: Option<&str>| -> ChapterBoundary {
            let mut value = json!({
                "label": "SOLUTIONS SQP-2",
                "start_page": 5,
                "end_page": 6
            });
            if let Some(folder) = folder {
                value["pdf_folder"] = json!(folder);
            }
            serde_json::from_value(value).expect("boundary")
        };

        assert_eq!(parse(Some("answer_keys")).kind, BoundaryKind::AnswerKey);
        assert_eq!(parse(Some("misc")).kind, BoundaryKind::Unknown);
        assert_eq!(parse(None).kind, BoundaryKind::Unknown);

        let explicit: ChapterBoundary = serde_json::from_value(json!({
            "label": "Mind Map-1",
            "kind": "unknown",
            "start_page": 1,
            "end_page": 1,
            "pdf_folder": "question_papers"
        }))
        .expect("boundary");
        assert_eq!(explicit.kind, BoundaryKind::Unknown);
    }
}
