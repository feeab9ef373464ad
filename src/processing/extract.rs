//! Question and answer extraction over bucket PDFs and split book folders.

use super::types::{
    ExtractError, ExtractionReport, FolderFileResult, FolderKindReport, FolderReport,
    FolderResults, STATUS_SUCCESS, SubjectsReport,
};
use crate::{
    extraction::{
        BookExtractor, ExtractionKind, GenerativeClient, available_subjects, subject_profile,
    },
    metrics::PipelineMetrics,
    storage::{GcsPath, ObjectStore, extraction_object},
};
use std::sync::Arc;

/// Extracts questions and answers with a generative model and stores the JSON results.
pub struct ExtractService {
    store: Arc<dyn ObjectStore>,
    model: Arc<dyn GenerativeClient>,
    metrics: Arc<PipelineMetrics>,
}

impl ExtractService {
    /// Service reading PDFs from `store` and prompting `model`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        model: Arc<dyn GenerativeClient>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            model,
            metrics,
        }
    }

    /// Extract `kind` from `pdf_path` into `extractions/{kind}/{name}_{kind}.json`.
    pub async fn extract(
        &self,
        pdf_path: &str,
        subject: &str,
        kind: ExtractionKind,
    ) -> Result<ExtractionReport, ExtractError> {
        let source = self.store.resolve(pdf_path)?;
        let target = source.with_object(extraction_object(kind.as_str(), &source.object));
        self.extract_to(&source, &target, subject, kind).await
    }

    /// Extract every question paper and answer key of a split book folder.
    ///
    /// A PDF that fails is recorded in the report and the remaining PDFs are still processed.
    pub async fn extract_book_folder(
        &self,
        folder_path: &str,
        subject: &str,
    ) -> Result<FolderReport, ExtractError> {
        let folder = self.store.resolve(folder_path)?;
        let folder = folder.with_object(folder.object.trim_end_matches('/').to_string());
        tracing::info!(folder = %folder, subject, "Extracting book folder");

        let questions = self
            .extract_folder_kind(&folder, subject, ExtractionKind::Questions)
            .await?;
        let answers = self
            .extract_folder_kind(&folder, subject, ExtractionKind::Answers)
            .await?;

        let report = FolderReport {
            status: STATUS_SUCCESS,
            folder_path: folder.object.clone(),
            subject: subject.to_string(),
            total_questions_extracted: questions.successful_extractions,
            total_answers_extracted: answers.successful_extractions,
            total_failed: questions.failed_extractions + answers.failed_extractions,
            extracted_questions_path: questions.output_folder.clone(),
            extracted_answers_path: answers.output_folder.clone(),
            results: FolderResults { questions, answers },
        };
        tracing::info!(
            folder = %folder,
            questions = report.total_questions_extracted,
            answers = report.total_answers_extracted,
            failed = report.total_failed,
            "Book folder extraction complete"
        );
        Ok(report)
    }

    async fn extract_folder_kind(
        &self,
        folder: &GcsPath,
        subject: &str,
        kind: ExtractionKind,
    ) -> Result<FolderKindReport, ExtractError> {
        let source_folder = format!("{}/{}", folder.object, kind.source_folder());
        let output_folder = format!("{}/{}", folder.object, kind.output_folder());
        let pdfs: Vec<String> = self
            .store
            .list(&folder.bucket, &format!("{source_folder}/"))
            .await?
            .into_iter()
            .filter(|name| name.to_ascii_lowercase().ends_with(".pdf"))
            .collect();
        if pdfs.is_empty() {
            tracing::warn!(folder = %source_folder, "No PDF files found");
        }

        let mut report = FolderKindReport {
            folder_path: source_folder,
            output_folder,
            total_files: pdfs.len(),
            ..FolderKindReport::default()
        };
        for pdf in pdfs {
            let source = folder.with_object(pdf.clone());
            let output_path = format!(
                "{}/{}_{}.json",
                report.output_folder,
                source.file_stem(),
                kind.as_str()
            );
            let target = folder.with_object(output_path.clone());
            match self.extract_to(&source, &target, subject, kind).await {
                Ok(extracted) => {
                    report.successful_extractions += 1;
                    report.results.push(FolderFileResult {
                        pdf_file: pdf,
                        status: STATUS_SUCCESS,
                        output_path: Some(output_path),
                        item_count: Some(extracted.total()),
                        error: None,
                    });
                }
                Err(error) => {
                    tracing::error!(pdf = %source, error = %error, "Extraction failed");
                    report.failed_extractions += 1;
                    report.results.push(FolderFileResult {
                        pdf_file: pdf,
                        status: "error",
                        output_path: None,
                        item_count: None,
                        error: Some(error.to_string()),
                    });
                }
            }
        }
        Ok(report)
    }

    async fn extract_to(
        &self,
        source: &GcsPath,
        target: &GcsPath,
        subject: &str,
        kind: ExtractionKind,
    ) -> Result<ExtractionReport, ExtractError> {
        tracing::info!(pdf = %source, subject, kind = kind.as_str(), "Extracting");
        let bytes = self.store.download(source).await?;
        let profile = subject_profile(subject);
        let output = BookExtractor::new(self.model.as_ref())
            .extract(&bytes, profile, kind)
            .await
            .map_err(|error| ExtractError::Generation {
                kind: kind.as_str(),
                source: error,
            })?;
        self.store.upload_json(target, &output.to_json()).await?;

        let total = output.items.len();
        self.metrics.record_extraction(total as u64);
        tracing::info!(pdf = %source, output = %target, total, "Extraction stored");

        let (total_questions, total_answers) = match kind {
            ExtractionKind::Questions => (Some(total), None),
            ExtractionKind::Answers => (None, Some(total)),
        };
        Ok(ExtractionReport {
            status: STATUS_SUCCESS,
            extraction_type: kind,
            subject: subject.to_string(),
            extraction_gcs_path: target.to_string(),
            pdf_path: source.to_string(),
            total_questions,
            total_answers,
            document_info: output.document_info,
        })
    }
}

/// Subjects accepted by the extraction operations.
pub fn subjects_report() -> SubjectsReport {
    SubjectsReport {
        status: STATUS_SUCCESS,
        subjects: available_subjects(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ScriptedModel;
    use crate::storage::memory::MemoryStore;

    const OVERVIEW: &str = r#"{"document_info": {"title": "SQP 1", "total_questions": 3, "total_answers": 3}}"#;

    fn service(store: Arc<MemoryStore>, model: ScriptedModel) -> ExtractService {
        ExtractService::new(store, Arc::new(model), Arc::new(PipelineMetrics::new()))
    }

    #[tokio::test]
    async fn extract_questions_uploads_result() {
        let store = Arc::new(MemoryStore::default());
        store.insert(
            GcsPath::new("test-bucket", "book/question_papers/SQP-1.pdf"),
            b"%PDF".to_vec(),
        );
        let service = service(store.clone(), ScriptedModel::new(Some(OVERVIEW)));

        let report = service
            .extract(
                "gs://test-bucket/book/question_papers/SQP-1.pdf",
                "computer_applications",
                ExtractionKind::Questions,
            )
            .await
            .expect("extract");

        assert_eq!(report.total_questions, Some(3));
        assert!(report.total_answers.is_none());
        assert_eq!(
            report.extraction_gcs_path,
            "gs://test-bucket/extractions/questions/book/question_papers/SQP-1_questions.json"
        );
        let stored = store
            .get(&GcsPath::new(
                "test-bucket",
                "extractions/questions/book/question_papers/SQP-1_questions.json",
            ))
            .expect("stored");
        let json: serde_json::Value = serde_json::from_slice(&stored).expect("json");
        assert_eq!(json["questions"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["document_info"]["title"], "SQP 1");
    }

    #[tokio::test]
    async fn extraction_fails_when_every_batch_fails() {
        let store = Arc::new(MemoryStore::default());
        store.insert(GcsPath::new("test-bucket", "paper.pdf"), b"%PDF".to_vec());
        let mut model = ScriptedModel::new(Some(OVERVIEW));
        model.fail_batches = true;

        let error = service(store.clone(), model)
            .extract("paper.pdf", "mathematics", ExtractionKind::Answers)
            .await
            .expect_err("should fail");
        assert!(matches!(error, ExtractError::Generation { kind: "answers", .. }));
        assert!(store.names().iter().all(|name| !name.starts_with("extractions/")));
    }

    #[tokio::test]
    async fn book_folder_extracts_both_kinds_and_records_failures() {
        let store = Arc::new(MemoryStore::default());
        store.insert(
            GcsPath::new("test-bucket", "book/question_papers/SQP-1.pdf"),
            b"%PDF".to_vec(),
        );
        store.insert(GcsPath::new("test-bucket", "book/question_papers/notes.txt"), b"x".to_vec());
        store.insert(
            GcsPath::new("test-bucket", "book/answer_keys/SQP-1-SOLUTION.pdf"),
            b"%PDF".to_vec(),
        );
        let service = service(store.clone(), ScriptedModel::new(Some(OVERVIEW)));

        let report = service
            .extract_book_folder("gs://test-bucket/book/", "computer_applications")
            .await
            .expect("folder");

        assert_eq!(report.folder_path, "book");
        assert_eq!(report.total_questions_extracted, 1);
        assert_eq!(report.total_answers_extracted, 1);
        assert_eq!(report.total_failed, 0);
        assert_eq!(report.extracted_answers_path, "book/extracted_answers");
        assert_eq!(report.results.questions.total_files, 1);
        let names = store.names();
        assert!(names.contains(&"book/extracted_questions/SQP-1_questions.json".to_string()));
        assert!(names.contains(&"book/extracted_answers/SQP-1-SOLUTION_answers.json".to_string()));
    }

    #[tokio::test]
    async fn failing_file_does_not_stop_folder() {
        let store = Arc::new(MemoryStore::default());
        store.insert(
            GcsPath::new("test-bucket", "book/question_papers/SQP-1.pdf"),
            b"%PDF".to_vec(),
        );
        let mut model = ScriptedModel::new(None);
        model.fail_batches = true;

        let report = service(store, model)
            .extract_book_folder("book", "computer_applications")
            .await
            .expect("folder");
        assert_eq!(report.total_failed, 1);
        assert_eq!(report.results.questions.results[0].status, "error");
        assert_eq!(report.results.answers.total_files, 0);
    }

    #[test]
    fn subjects_include_aliases() {
        let report = subjects_report();
        assert!(report.subjects.contains(&"computer_applications"));
        assert!(report.subjects.contains(&"maths"));
    }
}
