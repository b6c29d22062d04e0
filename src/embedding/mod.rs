//! Embedding client abstraction and the OpenAI adapter.
//!
//! Chunk and query texts are embedded through a single capability trait so the
//! workflow layer can swap in test doubles. The production adapter issues one
//! batched request to the OpenAI embeddings endpoint.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider could not be reached.
    #[error("embedding provider unreachable: {0}")]
    Unreachable(String),
    /// Provider returned a non-success response.
    #[error("embedding request failed with status {status}: {body}")]
    RequestFailed {
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Response body associated with the failure.
        body: String,
    },
    /// Provider response could not be decoded or was incomplete.
    #[error("malformed embedding response: {0}")]
    InvalidResponse(String),
    /// Returned vector width does not match the configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured on the server.
        expected: usize,
        /// Dimension actually produced by the provider.
        actual: usize,
    },
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text, in input order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embedding adapter backed by the OpenAI `/embeddings` endpoint.
pub struct OpenAiEmbeddingClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client for the given API key and model.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("readless/0.1")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        Self {
            http,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            model,
        }
    }

    /// Construct a client from the loaded configuration.
    ///
    /// Returns `None` when no OpenAI API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.openai_api_key.as_ref().map(|key| {
            Self::new(
                key.clone(),
                config.embedding_model.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        tracing::debug!(model = %self.model, inputs = expected, "Generating embeddings");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|error| EmbeddingError::Unreachable(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestFailed { status, body });
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|error| EmbeddingError::InvalidResponse(error.to_string()))?;

        if payload.data.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {expected} vectors, got {}",
                payload.data.len()
            )));
        }

        let mut data = payload.data;
        data.sort_by_key(|datum| datum.index);
        Ok(data.into_iter().map(|datum| datum.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn test_client(base_url: String) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient {
            http: Client::builder()
                .user_agent("readless-test")
                .build()
                .expect("client"),
            api_key: "test-key".into(),
            base_url,
            model: "text-embedding-3-small".into(),
        }
    }

    #[tokio::test]
    async fn embed_returns_vectors_in_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer test-key");
                then.status(200).json_body(serde_json::json!({
                    "object": "list",
                    "data": [
                        { "index": 1, "embedding": [0.3, 0.4] },
                        { "index": 0, "embedding": [0.1, 0.2] }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let vectors = client
            .embed(vec!["first".into(), "second".into()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn embed_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(429).body("rate limited");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .embed(vec!["text".into()])
            .await
            .expect_err("error response");

        assert!(matches!(
            error,
            EmbeddingError::RequestFailed { status, .. } if status.as_u16() == 429
        ));
    }

    #[tokio::test]
    async fn embed_rejects_vector_count_mismatch() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(200).json_body(serde_json::json!({
                    "data": [{ "index": 0, "embedding": [0.5] }]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .embed(vec!["a".into(), "b".into()])
            .await
            .expect_err("mismatch");

        assert!(matches!(error, EmbeddingError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn embed_short_circuits_on_empty_input() {
        let client = test_client("http://127.0.0.1:9".into());
        let vectors = client.embed(Vec::new()).await.expect("empty");
        assert!(vectors.is_empty());
    }
}
