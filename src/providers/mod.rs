//! Completion provider clients and the ordered fallback combinator.
//!
//! Model diversity is treated as a resilience mechanism: providers are tried
//! strictly in order and the first success wins. There is no best-of-N selection.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiChatClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a single completion provider call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Provider could not be reached (connect, timeout, body read).
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    /// Provider returned a non-success HTTP status.
    #[error("provider returned status {status}: {body}")]
    Api {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body associated with the failure.
        body: String,
    },
    /// Provider response could not be decoded into completion text.
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider responded successfully but produced no usable text.
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

/// Interface implemented by completion backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Stable provider name used for ordering diagnostics and logs.
    fn name(&self) -> &str;

    /// Produce completion text for a fully rendered prompt.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Terminal failure: every provider in the ordered sequence failed.
#[derive(Debug, Error)]
#[error("all providers exhausted (tried {attempted}); last error from {last_provider}: {source}")]
pub struct AllProvidersExhausted {
    /// Comma-joined names of the providers tried, in order.
    pub attempted: String,
    /// Name of the last provider tried.
    pub last_provider: String,
    /// Error returned by the last provider.
    #[source]
    pub source: CompletionError,
}

/// Try each provider in order, returning the first successful completion.
///
/// A call fails on transport error, non-success status, undecodable response, or
/// empty/whitespace-only text; the next provider is then tried. When the whole
/// sequence fails, the returned error carries the last provider's failure.
pub async fn complete_with_fallback(
    providers: &[Arc<dyn CompletionClient>],
    prompt: &str,
) -> Result<String, AllProvidersExhausted> {
    let mut attempted: Vec<&str> = Vec::with_capacity(providers.len());
    let mut last_error: Option<(String, CompletionError)> = None;

    for provider in providers {
        attempted.push(provider.name());
        match provider.complete(prompt).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    tracing::warn!(
                        provider = provider.name(),
                        "Provider returned empty completion; trying next"
                    );
                    last_error =
                        Some((provider.name().to_string(), CompletionError::EmptyCompletion));
                    continue;
                }
                tracing::debug!(provider = provider.name(), "Completion succeeded");
                return Ok(trimmed.to_string());
            }
            Err(error) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = %error,
                    "Provider call failed; trying next"
                );
                last_error = Some((provider.name().to_string(), error));
            }
        }
    }

    let (last_provider, source) = last_error.unwrap_or((
        "none".to_string(),
        CompletionError::InvalidResponse("no providers configured".to_string()),
    ));
    Err(AllProvidersExhausted {
        attempted: attempted.join(", "),
        last_provider,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StubProvider {
        name: &'static str,
        response: Result<&'static str, ()>,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl CompletionClient for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.lock().expect("call log").push(self.name);
            match self.response {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(CompletionError::Unreachable("stub failure".into())),
            }
        }
    }

    fn stub(
        name: &'static str,
        response: Result<&'static str, ()>,
        calls: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn CompletionClient> {
        Arc::new(StubProvider {
            name,
            response,
            calls: calls.clone(),
        })
    }

    #[tokio::test]
    async fn first_success_wins_and_stops_the_chain() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let providers = vec![
            stub("primary", Ok("answer"), &calls),
            stub("secondary", Ok("unused"), &calls),
        ];

        let text = complete_with_fallback(&providers, "prompt")
            .await
            .expect("completion");

        assert_eq!(text, "answer");
        assert_eq!(*calls.lock().expect("call log"), vec!["primary"]);
    }

    #[tokio::test]
    async fn failing_primary_falls_back_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let providers = vec![
            stub("primary", Err(()), &calls),
            stub("secondary", Ok("fallback answer"), &calls),
        ];

        let text = complete_with_fallback(&providers, "prompt")
            .await
            .expect("completion");

        assert_eq!(text, "fallback answer");
        assert_eq!(*calls.lock().expect("call log"), vec!["primary", "secondary"]);
    }

    #[tokio::test]
    async fn empty_completion_counts_as_failure() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let providers = vec![
            stub("primary", Ok("   "), &calls),
            stub("secondary", Ok("real answer"), &calls),
        ];

        let text = complete_with_fallback(&providers, "prompt")
            .await
            .expect("completion");

        assert_eq!(text, "real answer");
    }

    #[tokio::test]
    async fn exhausted_chain_reports_last_provider() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let providers = vec![
            stub("primary", Err(()), &calls),
            stub("secondary", Err(()), &calls),
        ];

        let error = complete_with_fallback(&providers, "prompt")
            .await
            .expect_err("exhausted");

        assert_eq!(error.last_provider, "secondary");
        assert_eq!(error.attempted, "primary, secondary");
        assert!(matches!(error.source, CompletionError::Unreachable(_)));
    }
}
