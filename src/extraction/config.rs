//! Extraction settings and batch planning.

use serde::Serialize;

/// What is pulled out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionKind {
    /// Questions from a question paper.
    Questions,
    /// Answers from an answer key.
    Answers,
}

impl ExtractionKind {
    /// Plural name used in JSON keys and storage paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Questions => "questions",
            Self::Answers => "answers",
        }
    }

    /// Singular item name (`question` / `answer`).
    pub fn item_name(self) -> &'static str {
        match self {
            Self::Questions => "question",
            Self::Answers => "answer",
        }
    }

    /// `total_questions` / `total_answers`.
    pub fn total_key(self) -> String {
        format!("total_{}", self.as_str())
    }

    /// Folder of a split book holding this kind's source PDFs.
    pub fn source_folder(self) -> &'static str {
        match self {
            Self::Questions => crate::analysis::QUESTION_PAPERS_FOLDER,
            Self::Answers => crate::analysis::ANSWER_KEYS_FOLDER,
        }
    }

    /// Folder of a split book receiving this kind's extraction JSON.
    pub fn output_folder(self) -> &'static str {
        match self {
            Self::Questions => "extracted_questions",
            Self::Answers => "extracted_answers",
        }
    }
}

/// One model call's worth of items, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    /// 1-based batch number.
    pub number: usize,
    /// First item in the batch.
    pub start: usize,
    /// Last item in the batch (inclusive).
    pub end: usize,
}

/// Per-subject extraction settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {
    /// Questions or answers.
    pub kind: ExtractionKind,
    /// Items requested per model call.
    pub batch_size: usize,
    /// Item count assumed when the overview does not report one.
    pub expected_total: usize,
    /// Output fields with the instruction for each.
    pub fields: Vec<(&'static str, &'static str)>,
}

impl ExtractionConfig {
    /// Split `total` items into consecutive batches of `batch_size`.
    pub fn batches(&self, total: usize) -> Vec<BatchRange> {
        let size = self.batch_size.max(1);
        (0..total)
            .step_by(size)
            .enumerate()
            .map(|(index, offset)| BatchRange {
                number: index + 1,
                start: offset + 1,
                end: (offset + size).min(total),
            })
            .collect()
    }

    /// JSON skeleton the model is asked to fill for one batch.
    pub fn json_schema(&self, batch: BatchRange) -> String {
        let item = self.kind.item_name();
        let fields = self
            .fields
            .iter()
            .map(|(name, description)| format!("      \"{name}\": \"{description}\""))
            .collect::<Vec<_>>()
            .join(",\n");
        format!(
            "{{\n  \"batch_info\": {{\n    \"batch_number\": {number},\n    \"start_{item}\": {start},\n    \"end_{item}\": {end}\n  }},\n  \"{plural}\": [\n    {{\n{fields}\n    }}\n  ]\n}}",
            number = batch.number,
            start = batch.start,
            end = batch.end,
            plural = self.kind.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(batch_size: usize) -> ExtractionConfig {
        ExtractionConfig {
            kind: ExtractionKind::Questions,
            batch_size,
            expected_total: 39,
            fields: vec![
                ("question_number", "exact number"),
                ("question_text", "full text"),
            ],
        }
    }

    #[test]
    fn batches_cover_every_item_once() {
        let batches = config(8).batches(19);
        assert_eq!(
            batches,
            vec![
                BatchRange { number: 1, start: 1, end: 8 },
                BatchRange { number: 2, start: 9, end: 16 },
                BatchRange { number: 3, start: 17, end: 19 },
            ]
        );
        assert!(config(8).batches(0).is_empty());
        assert_eq!(config(0).batches(2).len(), 2);
    }

    #[test]
    fn schema_is_valid_json_with_batch_info() {
        let schema = config(8).json_schema(BatchRange { number: 2, start: 9, end: 16 });
        let parsed: serde_json::Value = serde_json::from_str(&schema).expect("json");
        assert_eq!(parsed["batch_info"]["start_question"], 9);
        assert_eq!(parsed["questions"][0]["question_text"], "full text");
    }

    #[test]
    fn kind_names_match_storage_layout() {
        assert_eq!(ExtractionKind::Answers.total_key(), "total_answers");
        assert_eq!(ExtractionKind::Answers.source_folder(), "answer_keys");
        assert_eq!(ExtractionKind::Questions.output_folder(), "extracted_questions");
    }
}
