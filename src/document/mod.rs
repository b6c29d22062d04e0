//! Document loader capability: fetch a PDF and extract per-page text.
//!
//! The workflow layer depends on the [`DocumentLoader`] trait so tests can inject
//! fixed pages. The production implementation downloads the document to a scoped
//! temporary file and extracts text with `pdf-extract`; the temporary file is
//! removed on every exit path when the guard drops.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Extracted text for a single document page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Raw extracted text for the page; may be empty for image-only pages.
    pub text: String,
}

/// Errors raised while acquiring or decoding a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Transport-level download failure (connect, timeout, body read).
    #[error("failed to download document: {0}")]
    Download(String),
    /// Download completed with a non-success HTTP status.
    #[error("document download returned status {status}")]
    DownloadStatus {
        /// HTTP status returned by the document host.
        status: StatusCode,
    },
    /// The downloaded bytes could not be decoded into text.
    #[error("failed to extract text from document: {0}")]
    Extraction(String),
}

impl DocumentError {
    /// Whether retrying the operation could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Download(_) => true,
            Self::DownloadStatus { status } => status.is_server_error(),
            Self::Extraction(_) => false,
        }
    }
}

/// Capability that turns a document URL into per-page text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Fetch the document at `url` and extract its pages in order.
    async fn load_pages(&self, url: &str) -> Result<Vec<Page>, DocumentError>;
}

/// Production loader: HTTP download into a temporary file, then PDF text extraction.
pub struct PdfLoader {
    http: Client,
}

impl PdfLoader {
    /// Construct a loader whose downloads are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("readless/0.1")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for document downloads");
        Self { http }
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load_pages(&self, url: &str) -> Result<Vec<Page>, DocumentError> {
        tracing::debug!(url, "Downloading document");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| DocumentError::Download(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::warn!(url, %status, "Document download rejected");
            return Err(DocumentError::DownloadStatus { status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| DocumentError::Download(error.to_string()))?;

        let mut staged = NamedTempFile::new()
            .map_err(|error| DocumentError::Download(format!("failed to stage download: {error}")))?;
        staged
            .write_all(&bytes)
            .map_err(|error| DocumentError::Download(format!("failed to stage download: {error}")))?;

        // Extraction is CPU-bound; the temp file moves into the blocking task and is
        // removed when it drops there.
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_by_pages(staged.path())
        })
        .await
        .map_err(|error| DocumentError::Extraction(format!("extraction task failed: {error}")))?
        .map_err(|error| DocumentError::Extraction(error.to_string()))?;

        tracing::debug!(url, pages = pages.len(), "Document extracted");

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page {
                number: (index + 1) as u32,
                text,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};

    #[tokio::test]
    async fn load_pages_reports_download_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.pdf");
                then.status(404).body("not found");
            })
            .await;

        let loader = PdfLoader::new(Duration::from_secs(5));
        let error = loader
            .load_pages(&format!("{}/missing.pdf", server.base_url()))
            .await
            .expect_err("missing document");

        assert!(matches!(
            error,
            DocumentError::DownloadStatus { status } if status.as_u16() == 404
        ));
        assert!(!error.is_transient());
    }

    #[tokio::test]
    async fn load_pages_reports_extraction_failure_for_non_pdf_bytes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken.pdf");
                then.status(200).body("this is not a pdf");
            })
            .await;

        let loader = PdfLoader::new(Duration::from_secs(5));
        let error = loader
            .load_pages(&format!("{}/broken.pdf", server.base_url()))
            .await
            .expect_err("garbage bytes");

        assert!(matches!(error, DocumentError::Extraction(_)));
        assert!(!error.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let error = DocumentError::DownloadStatus {
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(error.is_transient());

        let error = DocumentError::Download("connection reset".into());
        assert!(error.is_transient());
    }
}
