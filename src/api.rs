//! HTTP surface for the ReadLess workflow server.
//!
//! A compact Axum router exposing the document workflows:
//!
//! - `POST /chat` – answer a question about a PDF through the RAG pipeline.
//! - `POST /summary/single` – summarize one PDF with an optional summary type.
//! - `POST /summary/batch` – summarize several PDFs and merge the results in order.
//! - `POST /health` – run the health ensemble and return the reconciled report.
//! - `GET /` – liveness text.
//! - `GET /metrics` – workflow counters.
//!
//! Responses use the `{"success": ..., "data"/"message": ...}` envelope. Requests
//! are validated before any external call: missing fields are rejected with 400,
//! everything downstream surfaces as 500 with a human-readable message.

use crate::metrics::MetricsSnapshot;
use crate::workflow::{
    AnalysisReport, ChatOutcome, ChatRequest, RequestOverrides, WorkflowApi, WorkflowError,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the workflow API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: WorkflowApi + 'static,
{
    Router::new()
        .route("/chat", post(chat::<S>))
        .route("/summary/single", post(summarize_single::<S>))
        .route("/summary/batch", post(summarize_batch::<S>))
        .route("/health", post(check_health::<S>))
        .route("/", get(root))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequestBody {
    pdf_url: Option<String>,
    query: Option<String>,
    #[serde(default)]
    config: Option<ChatConfigOverrides>,
}

/// Optional per-request pipeline overrides accepted by `POST /chat`.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ChatConfigOverrides {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
}

/// Success payload for `POST /chat`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponseData {
    question: String,
    answer: String,
    pdf_url: String,
    namespace: String,
}

async fn chat<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Response, AppError>
where
    S: WorkflowApi,
{
    let (Some(pdf_url), Some(query)) = (non_empty(body.pdf_url), non_empty(body.query)) else {
        return Err(AppError(WorkflowError::InvalidRequest(
            "Missing pdfUrl or query".to_string(),
        )));
    };

    let overrides = body.config.unwrap_or_default();
    let outcome: ChatOutcome = service
        .chat(ChatRequest {
            pdf_url: pdf_url.clone(),
            query,
            overrides: RequestOverrides {
                chunk_size: overrides.chunk_size,
                chunk_overlap: overrides.chunk_overlap,
                top_k: overrides.top_k,
            },
        })
        .await?;

    Ok(success(ChatResponseData {
        question: outcome.question,
        answer: outcome.answer,
        pdf_url,
        namespace: outcome.namespace,
    }))
}

/// Request body for `POST /summary/single`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryRequestBody {
    pdf_url: Option<String>,
    #[serde(default)]
    summary_type: Option<String>,
}

async fn summarize_single<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<SummaryRequestBody>,
) -> Result<Response, AppError>
where
    S: WorkflowApi,
{
    let Some(pdf_url) = non_empty(body.pdf_url) else {
        return Err(AppError(WorkflowError::InvalidRequest(
            "pdfUrl is required".to_string(),
        )));
    };

    let summary = service.summarize(&pdf_url, body.summary_type).await?;
    Ok(success(json!({ "summary": summary })))
}

/// Request body for `POST /summary/batch`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRequestBody {
    pdf_urls: Option<Vec<String>>,
}

async fn summarize_batch<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<BatchRequestBody>,
) -> Result<Response, AppError>
where
    S: WorkflowApi,
{
    let urls = body.pdf_urls.unwrap_or_default();
    if urls.is_empty() {
        return Err(AppError(WorkflowError::InvalidRequest(
            "pdfUrls array is required".to_string(),
        )));
    }

    let combined = service.summarize_batch(urls).await?;
    Ok(success(json!({ "combinedSummary": combined })))
}

/// Request body for `POST /health`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthRequestBody {
    pdf_url: Option<String>,
}

async fn check_health<S>(
    State(service): State<Arc<S>>,
    Json(body): Json<HealthRequestBody>,
) -> Result<Response, AppError>
where
    S: WorkflowApi,
{
    let Some(pdf_url) = non_empty(body.pdf_url) else {
        return Err(AppError(WorkflowError::InvalidRequest(
            "pdfUrl is required".to_string(),
        )));
    };

    let report: AnalysisReport = service.analyze_health(&pdf_url).await?;
    Ok(success(report))
}

async fn root() -> &'static str {
    "ReadLess AI server is running"
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: WorkflowApi,
{
    Json(service.metrics_snapshot())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn success<T: Serialize>(data: T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

struct AppError(WorkflowError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "Request pipeline failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = Json(json!({ "success": false, "message": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<WorkflowError> for AppError {
    fn from(inner: WorkflowError) -> Self {
        Self(inner)
    }
}
