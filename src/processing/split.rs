//! Analyze bucket PDFs and split them into question papers and answer keys.

use super::types::{AnalyzeReport, ProcessReport, STATUS_SUCCESS, SplitError, SplitReport};
use crate::{
    analysis::{AnalysisResult, PdfAnalyzer},
    metrics::PipelineMetrics,
    pdf::{PdfDocument, SplitFile, split_document, split_to_dir},
    storage::{GcsPath, ObjectStore, PDF_CONTENT_TYPE, analysis_object, split_object},
};
use std::path::Path;
use std::sync::Arc;

/// Runs the analyzer and splitter against objects in the bucket.
pub struct SplitService {
    store: Arc<dyn ObjectStore>,
    analyzer: PdfAnalyzer,
    metrics: Arc<PipelineMetrics>,
}

impl SplitService {
    /// Service reading and writing through `store`.
    pub fn new(store: Arc<dyn ObjectStore>, metrics: Arc<PipelineMetrics>) -> Self {
        Self {
            store,
            analyzer: PdfAnalyzer::new(),
            metrics,
        }
    }

    /// Analyze `pdf_path` and store the result at `{stem}/analysis.json`.
    pub async fn analyze(&self, pdf_path: &str) -> Result<AnalyzeReport, SplitError> {
        let source = self.store.resolve(pdf_path)?;
        tracing::info!(pdf = %source, "Analyzing PDF");
        let bytes = self.store.download(&source).await?;
        let analysis = self.analyzer.analyze_bytes(&source.to_string(), &bytes)?;
        if let Err(problems) = analysis.validate() {
            tracing::warn!(pdf = %source, ?problems, "Analysis violates range invariants");
        }
        self.metrics.record_analysis();

        let stem = source.pdf_stem().to_string();
        let target = source.with_object(analysis_object(&stem));
        let json = serde_json::to_value(&analysis).map_err(SplitError::InvalidAnalysis)?;
        self.store.upload_json(&target, &json).await?;
        tracing::info!(
            pdf = %source,
            analysis = %target,
            boundaries = analysis.boundaries.len(),
            confidence = analysis.confidence,
            "Analysis stored"
        );

        Ok(AnalyzeReport {
            status: STATUS_SUCCESS,
            analysis_result: analysis,
            analysis_gcs_path: target.to_string(),
            pdf_path: source.to_string(),
            pdf_folder: stem,
        })
    }

    /// Split `pdf_path` using the analysis stored at `analysis_path`.
    pub async fn split(
        &self,
        pdf_path: &str,
        analysis_path: &str,
    ) -> Result<SplitReport, SplitError> {
        let source = self.store.resolve(pdf_path)?;
        let analysis_source = self.store.resolve(analysis_path)?;
        let value = self.store.download_json(&analysis_source).await?;
        let analysis: AnalysisResult =
            serde_json::from_value(value).map_err(SplitError::InvalidAnalysis)?;
        let split_files = self.split_with(&source, &analysis).await?;

        Ok(SplitReport {
            status: STATUS_SUCCESS,
            total_files: split_files.len(),
            split_files,
            pdf_path: source.to_string(),
        })
    }

    /// Analyze then split in one pass.
    pub async fn process(&self, pdf_path: &str) -> Result<ProcessReport, SplitError> {
        let analyzed = self.analyze(pdf_path).await?;
        let source = self.store.resolve(&analyzed.pdf_path)?;
        let split_files = self.split_with(&source, &analyzed.analysis_result).await?;

        Ok(ProcessReport {
            status: STATUS_SUCCESS,
            pdf_path: analyzed.pdf_path,
            analysis_result: analyzed.analysis_result,
            analysis_gcs_path: analyzed.analysis_gcs_path,
            total_files: split_files.len(),
            split_files,
        })
    }

    async fn split_with(
        &self,
        source: &GcsPath,
        analysis: &AnalysisResult,
    ) -> Result<Vec<SplitFile>, SplitError> {
        tracing::info!(pdf = %source, boundaries = analysis.boundaries.len(), "Splitting PDF");
        let bytes = self.store.download(source).await?;
        let document = PdfDocument::from_bytes(&bytes)?;
        let stem = source.pdf_stem();

        let mut files = Vec::new();
        for part in split_document(&document, analysis) {
            let target = source.with_object(split_object(stem, &part.folder, &part.filename));
            let report = part.report(target.to_string());
            match self.store.upload(&target, part.bytes, PDF_CONTENT_TYPE).await {
                Ok(()) => files.push(report),
                Err(err) => {
                    tracing::error!(object = %target, error = %err, "Failed to upload split PDF");
                }
            }
        }

        if files.is_empty() {
            tracing::error!(pdf = %source, "Split produced no files");
            return Err(SplitError::NothingSplit(source.to_string()));
        }
        self.metrics.record_split(files.len() as u64);
        tracing::info!(pdf = %source, files = files.len(), "Split complete");
        Ok(files)
    }
}

/// Analyze a local PDF, optionally writing the result as JSON to `output`.
pub fn analyze_local(pdf: &Path, output: Option<&Path>) -> Result<AnalysisResult, SplitError> {
    let analysis = PdfAnalyzer::new().analyze_file(pdf)?;
    if let Some(output) = output {
        let json = serde_json::to_vec_pretty(&analysis).map_err(SplitError::InvalidAnalysis)?;
        std::fs::write(output, json).map_err(|source| SplitError::Io {
            path: output.display().to_string(),
            source,
        })?;
        tracing::info!(path = %output.display(), "Wrote analysis");
    }
    Ok(analysis)
}

/// Split a local PDF into `output_dir` using a local analysis JSON file.
pub fn split_local(
    pdf: &Path,
    analysis_path: &Path,
    output_dir: &Path,
) -> Result<Vec<SplitFile>, SplitError> {
    let raw = std::fs::read(analysis_path).map_err(|source| SplitError::Io {
        path: analysis_path.display().to_string(),
        source,
    })?;
    let analysis: AnalysisResult =
        serde_json::from_slice(&raw).map_err(SplitError::InvalidAnalysis)?;
    let document = PdfDocument::open(pdf)?;
    let files = split_to_dir(&document, &analysis, output_dir);
    if files.is_empty() {
        return Err(SplitError::NothingSplit(pdf.display().to_string()));
    }
    Ok(files)
}
