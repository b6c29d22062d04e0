//! Core data types and error definitions for the workflow pipeline.

use crate::config::Config;
use crate::document::DocumentError;
use crate::embedding::EmbeddingError;
use crate::providers::AllProvidersExhausted;
use crate::qdrant::QdrantError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted by the workflow pipeline.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Request carried missing or inconsistent fields; rejected before any external call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Document acquisition or text extraction failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Vector index was unreachable or rejected an operation.
    #[error("vector index operation failed: {0}")]
    Index(#[from] QdrantError),
    /// Embedding provider failed to produce vectors.
    #[error("failed to embed content: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Every configured completion provider failed for a generation step.
    #[error(transparent)]
    Generation(#[from] AllProvidersExhausted),
    /// Reconciliation output failed to parse into the expected report shape.
    #[error("analysis output did not match the report shape: {0}")]
    MalformedAnalysis(String),
    /// A batch member failed; the whole batch fails with it.
    #[error("batch member {url} failed: {source}")]
    BatchMember {
        /// Source URL of the failing member.
        url: String,
        /// Error raised by the member's pipeline.
        #[source]
        source: Box<WorkflowError>,
    },
}

impl WorkflowError {
    /// Whether the error is a request-validation failure (HTTP 400 at the boundary).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

/// Parameters for a chat request against one document.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Source URL of the PDF under discussion.
    pub pdf_url: String,
    /// The user's question.
    pub query: String,
    /// Per-request pipeline overrides.
    pub overrides: RequestOverrides,
}

/// Optional per-request overrides for the pipeline tunables.
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    /// Override for the chunk window, in characters.
    pub chunk_size: Option<usize>,
    /// Override for the chunk overlap, in characters.
    pub chunk_overlap: Option<usize>,
    /// Override for the retrieval result budget.
    pub top_k: Option<usize>,
}

/// Successful chat outcome.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// The question as asked.
    pub question: String,
    /// Generated answer text.
    pub answer: String,
    /// Cache namespace derived for the document.
    pub namespace: String,
}

/// A chunk returned from retrieval, with its similarity score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    /// Chunk text content.
    pub text: String,
    /// Source URL recorded at ingestion time, when present.
    pub source: Option<String>,
    /// 1-based page number recorded at ingestion time, when present.
    pub page: Option<u32>,
    /// Similarity score in `[0, 1]`.
    pub score: f32,
}

/// Structured health report produced by the ensemble analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Overall health score in `[0, 100]`.
    #[serde(deserialize_with = "lenient_score")]
    pub overall: f64,
    /// Readability score in `[0, 100]`.
    #[serde(deserialize_with = "lenient_score")]
    pub readability: f64,
    /// Structure score in `[0, 100]`.
    #[serde(deserialize_with = "lenient_score")]
    pub structure: f64,
    /// Clarity score in `[0, 100]`.
    #[serde(deserialize_with = "lenient_score")]
    pub clarity: f64,
    /// Merged improvement recommendations.
    #[serde(default)]
    pub recommendation: Vec<String>,
}

/// Pipeline tunables resolved from configuration, overridable per chat request.
#[derive(Debug, Clone)]
pub struct Tunables {
    /// Default chunk window, in characters.
    pub chunk_size: usize,
    /// Default chunk overlap, in characters.
    pub chunk_overlap: usize,
    /// Default retrieval result budget.
    pub top_k: usize,
    /// Minimum similarity score accepted from retrieval.
    pub score_threshold: f32,
    /// Expected embedding vector width.
    pub embedding_dimension: usize,
}

impl Tunables {
    /// Extract the pipeline tunables from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            top_k: config.top_k,
            score_threshold: config.score_threshold,
            embedding_dimension: config.embedding_dimension,
        }
    }

    /// Merge per-request overrides over the defaults, validating the result.
    pub(crate) fn resolve(
        &self,
        overrides: &RequestOverrides,
    ) -> Result<IngestSettings, WorkflowError> {
        let chunk_size = overrides.chunk_size.unwrap_or(self.chunk_size);
        let chunk_overlap = overrides.chunk_overlap.unwrap_or(self.chunk_overlap);
        let top_k = overrides.top_k.unwrap_or(self.top_k);

        if chunk_size == 0 {
            return Err(WorkflowError::InvalidRequest(
                "chunkSize must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(WorkflowError::InvalidRequest(
                "chunkOverlap must be smaller than chunkSize".to_string(),
            ));
        }
        if top_k == 0 {
            return Err(WorkflowError::InvalidRequest(
                "topK must be greater than zero".to_string(),
            ));
        }

        Ok(IngestSettings {
            chunk_size,
            chunk_overlap,
            top_k,
        })
    }
}

/// Effective per-request pipeline settings after override resolution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IngestSettings {
    pub(crate) chunk_size: usize,
    pub(crate) chunk_overlap: usize,
    pub(crate) top_k: usize,
}

/// Accept scores encoded as JSON numbers or numeric strings.
///
/// Reconciliation models occasionally quote numeric fields; quoting alone should
/// not fail the request.
fn lenient_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct ScoreVisitor;

    impl de::Visitor<'_> for ScoreVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or a numeric string")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("not a numeric score: {value:?}")))
        }
    }

    deserializer.deserialize_any(ScoreVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunables() -> Tunables {
        Tunables {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 12,
            score_threshold: 0.25,
            embedding_dimension: 1536,
        }
    }

    #[test]
    fn resolve_keeps_defaults_without_overrides() {
        let settings = tunables()
            .resolve(&RequestOverrides::default())
            .expect("settings");
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.chunk_overlap, 200);
        assert_eq!(settings.top_k, 12);
    }

    #[test]
    fn resolve_applies_overrides() {
        let overrides = RequestOverrides {
            chunk_size: Some(400),
            chunk_overlap: Some(50),
            top_k: Some(4),
        };
        let settings = tunables().resolve(&overrides).expect("settings");
        assert_eq!(settings.chunk_size, 400);
        assert_eq!(settings.chunk_overlap, 50);
        assert_eq!(settings.top_k, 4);
    }

    #[test]
    fn resolve_rejects_overlap_not_smaller_than_size() {
        let overrides = RequestOverrides {
            chunk_size: Some(100),
            chunk_overlap: Some(100),
            top_k: None,
        };
        let error = tunables().resolve(&overrides).expect_err("invalid overlap");
        assert!(error.is_validation());
    }

    #[test]
    fn resolve_rejects_zero_top_k() {
        let overrides = RequestOverrides {
            chunk_size: None,
            chunk_overlap: None,
            top_k: Some(0),
        };
        let error = tunables().resolve(&overrides).expect_err("invalid topK");
        assert!(error.is_validation());
    }

    #[test]
    fn report_accepts_numeric_strings() {
        let report: AnalysisReport = serde_json::from_str(
            r#"{"overall": "82", "readability": 75, "structure": 80.5, "clarity": "90.0", "recommendation": ["tighten headings"]}"#,
        )
        .expect("report");
        assert_eq!(report.overall, 82.0);
        assert_eq!(report.clarity, 90.0);
        assert_eq!(report.recommendation.len(), 1);
    }

    #[test]
    fn report_rejects_non_numeric_score() {
        let result: Result<AnalysisReport, _> = serde_json::from_str(
            r#"{"overall": "great", "readability": 1, "structure": 1, "clarity": 1}"#,
        );
        assert!(result.is_err());
    }
}
