use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing workflow activity.
#[derive(Default)]
pub struct WorkflowMetrics {
    documents_ingested: AtomicU64,
    chunks_indexed: AtomicU64,
    answers_generated: AtomicU64,
    summaries_generated: AtomicU64,
    analyses_completed: AtomicU64,
}

impl WorkflowMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingested document and the number of chunks written for it.
    pub fn record_ingestion(&self, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed
            .fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a completed chat answer.
    pub fn record_answer(&self) {
        self.answers_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed summary (single or batch member).
    pub fn record_summary(&self) {
        self.summaries_generated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed health analysis.
    pub fn record_analysis(&self) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            answers_generated: self.answers_generated.load(Ordering::Relaxed),
            summaries_generated: self.summaries_generated.load(Ordering::Relaxed),
            analyses_completed: self.analyses_completed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of workflow counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Number of documents ingested into the vector index since startup.
    pub documents_ingested: u64,
    /// Total chunk count written across all ingested documents.
    pub chunks_indexed: u64,
    /// Number of chat answers produced.
    pub answers_generated: u64,
    /// Number of summaries produced.
    pub summaries_generated: u64,
    /// Number of health analyses produced.
    pub analyses_completed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_ingestions_and_chunks() {
        let metrics = WorkflowMetrics::new();
        metrics.record_ingestion(2);
        metrics.record_ingestion(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_ingested, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
    }

    #[test]
    fn records_generation_counters() {
        let metrics = WorkflowMetrics::new();
        metrics.record_answer();
        metrics.record_summary();
        metrics.record_summary();
        metrics.record_analysis();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.answers_generated, 1);
        assert_eq!(snapshot.summaries_generated, 2);
        assert_eq!(snapshot.analyses_completed, 1);
    }
}
