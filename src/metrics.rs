use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_analyzed: AtomicU64,
    files_split: AtomicU64,
    items_extracted: AtomicU64,
    documents_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one analyzed document.
    pub fn record_analysis(&self) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record files written by a split.
    pub fn record_split(&self, file_count: u64) {
        self.files_split.fetch_add(file_count, Ordering::Relaxed);
    }

    /// Record questions or answers extracted from one document.
    pub fn record_extraction(&self, item_count: u64) {
        self.items_extracted.fetch_add(item_count, Ordering::Relaxed);
    }

    /// Record an ingested document and the number of chunks indexed for it.
    pub fn record_ingest(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            files_split: self.files_split.load(Ordering::Relaxed),
            items_extracted: self.items_extracted.load(Ordering::Relaxed),
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// PDFs analyzed since startup.
    pub documents_analyzed: u64,
    /// Split PDFs written since startup.
    pub files_split: u64,
    /// Questions and answers extracted since startup.
    pub items_extracted: u64,
    /// Documents ingested into Qdrant since startup.
    pub documents_ingested: u64,
    /// Total chunks indexed across all ingested documents.
    pub chunks_indexed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_each_stage() {
        let metrics = PipelineMetrics::new();
        metrics.record_analysis();
        metrics.record_split(3);
        metrics.record_extraction(39);
        metrics.record_ingest(2);
        metrics.record_ingest(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_analyzed, 1);
        assert_eq!(snapshot.files_split, 3);
        assert_eq!(snapshot.items_extracted, 39);
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
