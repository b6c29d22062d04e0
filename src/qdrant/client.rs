//! HTTP client wrapper for interacting with Qdrant.
//!
//! One namespace maps to one Qdrant collection. The ingestion cache probes the
//! collection's point count; ingestion writes the whole chunk batch in a single
//! upsert; retrieval is a namespace-scoped similarity query.

use crate::config::Config;
use crate::qdrant::{
    payload::{build_payload, current_timestamp_rfc3339, generate_point_id},
    types::{
        CollectionInfoResponse, PointInsert, QdrantError, QueryResponse, QueryResponseResult,
        ScoredPoint,
    },
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client for the given endpoint.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, QdrantError> {
        let client = Client::builder()
            .user_agent("readless/0.1")
            .timeout(timeout)
            .build()?;

        let base_url = normalize_base_url(base_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Construct a client using the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Count the points stored under a namespace. A missing collection counts as zero.
    pub async fn namespace_point_count(&self, namespace: &str) -> Result<u64, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{namespace}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let payload: CollectionInfoResponse = response.json().await?;
                Ok(payload.result.points_count.unwrap_or(0))
            }
            StatusCode::NOT_FOUND => Ok(0),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(namespace, error = %error, "Namespace probe failed");
                Err(error)
            }
        }
    }

    /// Create the namespace collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        namespace: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(namespace).await? {
            return Ok(());
        }

        tracing::debug!(namespace, vector_size, "Creating namespace collection");
        self.create_collection(namespace, vector_size).await
    }

    /// Create or update the namespace collection with the specified vector size.
    pub async fn create_collection(
        &self,
        namespace: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{namespace}"))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(namespace, "Namespace collection ensured");
        })
        .await
    }

    /// Upload chunk vectors to the namespace in one logical write.
    pub async fn index_points(
        &self,
        namespace: &str,
        points: Vec<PointInsert>,
    ) -> Result<usize, QdrantError> {
        if points.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let serialized: Vec<_> = points
            .into_iter()
            .map(|point| {
                let payload = build_payload(
                    &point.text,
                    &point.source,
                    point.page,
                    &point.chunk_hash,
                    &now,
                );
                json!({
                    "id": generate_point_id(),
                    "vector": point.vector,
                    "payload": payload,
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(Method::PUT, &format!("collections/{namespace}/points"))?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(namespace, points = point_count, "Points indexed");
        })
        .await?;

        Ok(point_count)
    }

    /// Perform a similarity search scoped to the namespace, returning scored payloads.
    ///
    /// Qdrant returns hits ordered by descending score; the threshold is applied
    /// server-side so no returned point scores below it.
    pub async fn search_points(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        limit: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = json!({
            "query": vector,
            "limit": limit,
            "score_threshold": score_threshold,
            "with_payload": true,
        });

        let response = self
            .request(Method::POST, &format!("collections/{namespace}/points/query"))?
            .json(&body)
            .send()
            .await?;

        // A namespace with no collection has nothing indexed; empty retrieval is
        // a valid outcome, not an error.
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(namespace, "Namespace collection missing; empty retrieval");
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(namespace, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points, .. } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    async fn collection_exists(&self, namespace: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{namespace}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(namespace, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
