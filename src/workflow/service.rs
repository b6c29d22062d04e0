//! Workflow service coordinating ingestion, retrieval, and generation.

use crate::{
    config::Config,
    document::{DocumentError, DocumentLoader, PdfLoader},
    embedding::{EmbeddingClient, EmbeddingError, OpenAiEmbeddingClient},
    metrics::{MetricsSnapshot, WorkflowMetrics},
    namespace::derive_namespace,
    prompts::{
        BATCH_SUMMARY_TYPE, DEFAULT_SUMMARY_TYPE, render_chat_prompt, render_health_prompt,
        render_reconciliation_prompt, render_summary_prompt,
    },
    providers::{
        CompletionClient, GeminiClient, OpenAiChatClient, complete_with_fallback,
    },
    qdrant::{PointInsert, QdrantError, QdrantService, ScoredPoint, compute_chunk_hash},
    workflow::{
        analysis::parse_report,
        ingest::{join_pages, split_pages},
        locks::NamespaceLocks,
        retry::{RetryPolicy, with_retries},
        types::{
            AnalysisReport, ChatOutcome, ChatRequest, IngestSettings, RetrievedChunk, Tunables,
            WorkflowError,
        },
    },
};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;

/// Minimum extractable characters required before a health analysis runs.
const MIN_ANALYZABLE_CHARS: usize = 10;

/// Separator placed between batch summary sections.
const BATCH_SEPARATOR: &str = "\n\n------------------------------\n\n";

/// Coordinates the full pipeline: namespace caching, ingestion, retrieval, and
/// generation across the ordered provider chain.
///
/// The service owns long-lived handles to every external capability so the HTTP
/// surface can share one instance through an `Arc`. All handles are injected,
/// which keeps test doubles trivial to substitute.
pub struct WorkflowService {
    loader: Arc<dyn DocumentLoader>,
    embedding: Arc<dyn EmbeddingClient>,
    qdrant: QdrantService,
    generation_providers: Vec<Arc<dyn CompletionClient>>,
    analysis_providers: Vec<Arc<dyn CompletionClient>>,
    locks: NamespaceLocks,
    retry: RetryPolicy,
    tunables: Tunables,
    metrics: Arc<WorkflowMetrics>,
}

/// Abstraction over the workflow pipeline consumed by the HTTP surface.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Answer a question about one document through the RAG pipeline.
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, WorkflowError>;

    /// Produce a summary of one document. `summary_type` defaults when absent.
    async fn summarize(
        &self,
        pdf_url: &str,
        summary_type: Option<String>,
    ) -> Result<String, WorkflowError>;

    /// Summarize several documents concurrently and merge the results in input order.
    async fn summarize_batch(&self, pdf_urls: Vec<String>) -> Result<String, WorkflowError>;

    /// Run the health ensemble over one document.
    async fn analyze_health(&self, pdf_url: &str) -> Result<AnalysisReport, WorkflowError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl WorkflowService {
    /// Build the production service from the loaded configuration.
    ///
    /// Requires `OPENAI_API_KEY` (embeddings always go through OpenAI) and at
    /// least one completion provider key; both are enforced at startup.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        let timeout = std::time::Duration::from_secs(config.request_timeout_secs);
        let qdrant = QdrantService::from_config(config)?;
        let embedding = OpenAiEmbeddingClient::from_config(config)
            .expect("OPENAI_API_KEY is required for embeddings");

        let mut generation_providers: Vec<Arc<dyn CompletionClient>> = Vec::new();
        if let Some(client) = OpenAiChatClient::from_config(config) {
            generation_providers.push(Arc::new(client));
        }
        if let Some(client) = GeminiClient::from_config(config) {
            generation_providers.push(Arc::new(client));
        }
        assert!(
            !generation_providers.is_empty(),
            "at least one completion provider must be configured"
        );
        // The health ensemble currently contributes a single analysis, produced by
        // the primary provider; the merge logic accepts any count of analyses.
        let analysis_providers = vec![generation_providers[0].clone()];

        tracing::info!(
            providers = %generation_providers
                .iter()
                .map(|provider| provider.name())
                .collect::<Vec<_>>()
                .join(", "),
            "Workflow service initialized"
        );

        Ok(Self::new(
            Arc::new(PdfLoader::new(timeout)),
            Arc::new(embedding),
            qdrant,
            generation_providers,
            analysis_providers,
            Tunables::from_config(config),
            RetryPolicy::from_config(config),
        ))
    }

    /// Assemble a service from explicit capability handles.
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        embedding: Arc<dyn EmbeddingClient>,
        qdrant: QdrantService,
        generation_providers: Vec<Arc<dyn CompletionClient>>,
        analysis_providers: Vec<Arc<dyn CompletionClient>>,
        tunables: Tunables,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            loader,
            embedding,
            qdrant,
            generation_providers,
            analysis_providers,
            locks: NamespaceLocks::new(),
            retry,
            tunables,
            metrics: Arc::new(WorkflowMetrics::new()),
        }
    }

    /// Probe the ingestion cache for a namespace.
    ///
    /// An unreachable index degrades to a cache miss: redundant ingestion is
    /// preferred over answering from data whose presence cannot be confirmed.
    async fn namespace_cached(&self, namespace: &str) -> bool {
        match self.qdrant.namespace_point_count(namespace).await {
            Ok(count) => count > 0,
            Err(error) => {
                tracing::warn!(
                    namespace,
                    error = %error,
                    "Ingestion cache probe failed; treating as cache miss"
                );
                false
            }
        }
    }

    /// Download, chunk, embed, and index one document under its namespace.
    ///
    /// Returns the number of chunks written. All-or-nothing: any step failing
    /// fails the whole ingestion and nothing marks the namespace as cached
    /// (the cache probe requires a positive point count).
    async fn ingest(
        &self,
        source: &str,
        namespace: &str,
        settings: &IngestSettings,
    ) -> Result<usize, WorkflowError> {
        tracing::info!(namespace, source, "Namespace not indexed; ingesting document");

        let pages = with_retries(
            &self.retry,
            "document download",
            DocumentError::is_transient,
            || self.loader.load_pages(source),
        )
        .await?;

        let chunks = split_pages(&pages, settings.chunk_size, settings.chunk_overlap);
        if chunks.is_empty() {
            tracing::warn!(namespace, source, "Document produced no chunks; nothing to index");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedding.embed(texts).await?;
        debug_assert_eq!(chunks.len(), vectors.len());

        let points: Vec<PointInsert> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| PointInsert {
                chunk_hash: compute_chunk_hash(&chunk.text),
                text: chunk.text,
                source: source.to_string(),
                page: chunk.page,
                vector,
            })
            .collect();

        let dimension = self.tunables.embedding_dimension as u64;
        with_retries(
            &self.retry,
            "namespace create",
            QdrantError::is_transient,
            || self.qdrant.create_collection_if_not_exists(namespace, dimension),
        )
        .await?;

        let written = with_retries(&self.retry, "index write", QdrantError::is_transient, || {
            self.qdrant.index_points(namespace, points.clone())
        })
        .await?;

        self.metrics.record_ingestion(written as u64);
        tracing::info!(namespace, chunks = written, "Document ingested");
        Ok(written)
    }

    /// Retrieve the most relevant chunks for a query within a namespace.
    ///
    /// Results arrive ordered by descending similarity; the score threshold is
    /// enforced by the index. Zero results is a valid outcome.
    async fn retrieve(
        &self,
        namespace: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, WorkflowError> {
        let mut vectors = self.embedding.embed(vec![query.to_string()]).await?;
        let vector = vectors.pop().ok_or_else(|| {
            WorkflowError::Embedding(EmbeddingError::InvalidResponse(
                "no vector returned for query".into(),
            ))
        })?;

        let expected = self.tunables.embedding_dimension;
        if vector.len() != expected {
            return Err(WorkflowError::Embedding(EmbeddingError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }));
        }

        let threshold = self.tunables.score_threshold;
        let hits = with_retries(
            &self.retry,
            "similarity search",
            QdrantError::is_transient,
            || self.qdrant.search_points(namespace, vector.clone(), top_k, threshold),
        )
        .await?;

        Ok(hits.into_iter().map(chunk_from_point).collect())
    }

    async fn summarize_inner(
        &self,
        pdf_url: &str,
        summary_type: &str,
    ) -> Result<String, WorkflowError> {
        tracing::info!(url = pdf_url, summary_type, "Summary requested");

        let pages = with_retries(
            &self.retry,
            "document download",
            DocumentError::is_transient,
            || self.loader.load_pages(pdf_url),
        )
        .await?;

        let content = join_pages(&pages);
        if content.is_empty() {
            return Err(DocumentError::Extraction(
                "document produced no extractable text (possibly scanned or protected)".into(),
            )
            .into());
        }

        let prompt = render_summary_prompt(&content, summary_type);
        let summary = complete_with_fallback(&self.generation_providers, &prompt).await?;
        self.metrics.record_summary();
        Ok(summary)
    }
}

#[async_trait]
impl WorkflowApi for WorkflowService {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, WorkflowError> {
        let settings = self.tunables.resolve(&request.overrides)?;
        let namespace = derive_namespace(&request.pdf_url);
        tracing::info!(namespace, url = %request.pdf_url, "Chat request started");

        {
            // Cache check and ingest run under the namespace lease so concurrent
            // requests for the same uncached document ingest exactly once.
            let _lease = self.locks.acquire(&namespace).await;
            if self.namespace_cached(&namespace).await {
                tracing::debug!(namespace, "Namespace already indexed; skipping ingestion");
            } else {
                self.ingest(&request.pdf_url, &namespace, &settings).await?;
            }
        }

        let chunks = self
            .retrieve(&namespace, &request.query, settings.top_k)
            .await?;
        tracing::debug!(namespace, retrieved = chunks.len(), "Context retrieved");

        let context = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = render_chat_prompt(&context, &request.query);
        let answer = complete_with_fallback(&self.generation_providers, &prompt).await?;

        self.metrics.record_answer();
        Ok(ChatOutcome {
            question: request.query,
            answer,
            namespace,
        })
    }

    async fn summarize(
        &self,
        pdf_url: &str,
        summary_type: Option<String>,
    ) -> Result<String, WorkflowError> {
        let summary_type = summary_type
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SUMMARY_TYPE.to_string());
        self.summarize_inner(pdf_url, &summary_type).await
    }

    async fn summarize_batch(&self, pdf_urls: Vec<String>) -> Result<String, WorkflowError> {
        if pdf_urls.is_empty() {
            return Err(WorkflowError::InvalidRequest(
                "pdfUrls must not be empty".to_string(),
            ));
        }

        tracing::info!(documents = pdf_urls.len(), "Batch summarization started");

        // All-or-nothing join: the first failing member aborts the whole batch.
        let tasks = pdf_urls.iter().map(|url| {
            let url = url.clone();
            async move {
                self.summarize_inner(&url, BATCH_SUMMARY_TYPE)
                    .await
                    .map_err(|error| WorkflowError::BatchMember {
                        url,
                        source: Box::new(error),
                    })
            }
        });
        let summaries = try_join_all(tasks).await?;

        let combined = summaries
            .iter()
            .enumerate()
            .map(|(index, summary)| format!("### Summary for PDF {}\n{}", index + 1, summary))
            .collect::<Vec<_>>()
            .join(BATCH_SEPARATOR);

        tracing::info!(documents = summaries.len(), "Batch summarization merged");
        Ok(combined)
    }

    async fn analyze_health(&self, pdf_url: &str) -> Result<AnalysisReport, WorkflowError> {
        tracing::info!(url = pdf_url, "Health analysis requested");

        let pages = with_retries(
            &self.retry,
            "document download",
            DocumentError::is_transient,
            || self.loader.load_pages(pdf_url),
        )
        .await?;

        let content = join_pages(&pages);
        if content.trim().chars().count() < MIN_ANALYZABLE_CHARS {
            return Err(
                DocumentError::Extraction("document text is empty or unreadable".into()).into(),
            );
        }

        // Each contributing analysis is a single-provider generation call; the
        // calls share no state and run concurrently.
        let prompt = render_health_prompt(&content);
        let analyses = try_join_all(self.analysis_providers.iter().map(|provider| {
            let prompt = &prompt;
            async move { complete_with_fallback(std::slice::from_ref(provider), prompt).await }
        }))
        .await?;
        tracing::debug!(analyses = analyses.len(), "Ensemble analyses collected");

        let reconciliation = render_reconciliation_prompt(&analyses);
        let raw = complete_with_fallback(&self.generation_providers, &reconciliation).await?;
        let report = parse_report(&raw)?;

        self.metrics.record_analysis();
        Ok(report)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Map a scored index point into a retrieved chunk.
fn chunk_from_point(point: ScoredPoint) -> RetrievedChunk {
    let ScoredPoint { score, payload, .. } = point;

    let mut text = String::new();
    let mut source = None;
    let mut page = None;

    if let Some(mut map) = payload {
        if let Some(Value::String(value)) = map.remove("text") {
            text = value;
        }
        if let Some(Value::String(value)) = map.remove("source") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                source = Some(trimmed.to_string());
            }
        }
        if let Some(value) = map.remove("page") {
            page = value.as_u64().map(|number| number as u32);
        }
    }

    RetrievedChunk {
        text,
        source,
        page,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn chunk_from_point_extracts_payload_fields() {
        let mut payload = Map::new();
        payload.insert("text".into(), Value::String("Example".into()));
        payload.insert(
            "source".into(),
            Value::String("https://example.org/a.pdf".into()),
        );
        payload.insert("page".into(), Value::from(4));

        let chunk = chunk_from_point(ScoredPoint {
            id: "chunk-1".into(),
            score: 0.42,
            payload: Some(payload),
        });

        assert_eq!(chunk.text, "Example");
        assert_eq!(chunk.source.as_deref(), Some("https://example.org/a.pdf"));
        assert_eq!(chunk.page, Some(4));
        assert!((chunk.score - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn chunk_from_point_tolerates_missing_payload() {
        let chunk = chunk_from_point(ScoredPoint {
            id: "chunk-2".into(),
            score: 0.3,
            payload: None,
        });
        assert!(chunk.text.is_empty());
        assert!(chunk.source.is_none());
        assert!(chunk.page.is_none());
    }
}
