//! Full-stack HTTP tests: the Axum router over a real workflow service wired to
//! stub capabilities and an httpmock-backed Qdrant.

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use httpmock::{Method::GET, Method::POST, MockServer};
use readless::api::create_router;
use readless::document::{DocumentError, DocumentLoader, Page};
use readless::embedding::{EmbeddingClient, EmbeddingError};
use readless::namespace::derive_namespace;
use readless::providers::{CompletionClient, CompletionError};
use readless::qdrant::QdrantService;
use readless::workflow::{RetryPolicy, Tunables, WorkflowService};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const DIMENSION: usize = 4;

struct FixedLoader;

#[async_trait]
impl DocumentLoader for FixedLoader {
    async fn load_pages(&self, _url: &str) -> Result<Vec<Page>, DocumentError> {
        Ok(vec![Page {
            number: 1,
            text: "A page with enough text to analyze.".to_string(),
        }])
    }
}

struct FixedEmbedding;

#[async_trait]
impl EmbeddingClient for FixedEmbedding {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![0.2; DIMENSION]).collect())
    }
}

struct FixedProvider(&'static str);

#[async_trait]
impl CompletionClient for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Ok(self.0.to_string())
    }
}

fn build_service(server: &MockServer, completion: &'static str) -> WorkflowService {
    let provider: Arc<dyn CompletionClient> = Arc::new(FixedProvider(completion));
    WorkflowService::new(
        Arc::new(FixedLoader),
        Arc::new(FixedEmbedding),
        QdrantService::new(&server.base_url(), None, Duration::from_secs(5)).expect("qdrant"),
        vec![provider.clone()],
        vec![provider],
        Tunables {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 12,
            score_threshold: 0.25,
            embedding_dimension: DIMENSION,
        },
        RetryPolicy {
            max_retries: 0,
            delay: Duration::ZERO,
        },
    )
}

async fn post_json(service: WorkflowService, uri: &str, body: Value) -> (StatusCode, Value) {
    let app = create_router(Arc::new(service));
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&bytes).expect("json body");
    (status, json)
}

#[tokio::test]
async fn chat_round_trip_through_router_and_pipeline() {
    let url = "https://example.org/full-stack.pdf";
    let namespace = derive_namespace(url);
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/collections/{namespace}"));
            then.status(200).json_body(json!({
                "status": "ok", "time": 0.0,
                "result": { "points_count": 3, "status": "green" }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/collections/{namespace}/points/query"));
            then.status(200).json_body(json!({
                "status": "ok", "time": 0.0,
                "result": { "points": [
                    { "id": "a", "score": 0.9, "payload": { "text": "Relevant chunk.", "source": url, "page": 1 } }
                ]}
            }));
        })
        .await;

    let service = build_service(&server, "Answer over HTTP.");
    let (status, body) = post_json(
        service,
        "/chat",
        json!({ "pdfUrl": url, "query": "What is covered?" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["answer"], "Answer over HTTP.");
    assert_eq!(body["data"]["namespace"], namespace.as_str());
    assert_eq!(body["data"]["pdfUrl"], url);
}

#[tokio::test]
async fn health_round_trip_returns_report_fields() {
    let server = MockServer::start_async().await;
    let service = build_service(
        &server,
        r#"{"overall": 77, "readability": 70, "structure": 80, "clarity": 75, "recommendation": ["number the sections"]}"#,
    );

    let (status, body) = post_json(
        service,
        "/health",
        json!({ "pdfUrl": "https://example.org/doc.pdf" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["overall"], 77.0);
    assert_eq!(body["data"]["recommendation"][0], "number the sections");
}

#[tokio::test]
async fn missing_pdf_url_is_rejected_without_touching_the_pipeline() {
    let server = MockServer::start_async().await;
    let service = build_service(&server, "unused");

    let (status, body) = post_json(service, "/summary/single", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "invalid request: pdfUrl is required");
}
