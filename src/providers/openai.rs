//! OpenAI chat-completions adapter.

use crate::config::Config;
use crate::providers::{CompletionClient, CompletionError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Completion client backed by the OpenAI chat completions endpoint.
pub struct OpenAiChatClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatClient {
    /// Construct a client for the given API key, model, and sampling temperature.
    pub fn new(api_key: String, model: String, temperature: f32, timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent("readless/0.1")
            .timeout(timeout)
            .build()
            .expect("Failed to construct reqwest::Client for OpenAI");
        Self {
            http,
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
            model,
            temperature,
        }
    }

    /// Construct a client from the loaded configuration, when a key is present.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.openai_api_key.as_ref().map(|key| {
            Self::new(
                key.clone(),
                config.openai_model.clone(),
                config.temperature,
                Duration::from_secs(config.request_timeout_secs),
            )
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionClient for OpenAiChatClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| CompletionError::Unreachable(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| CompletionError::InvalidResponse(error.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn test_client(base_url: String) -> OpenAiChatClient {
        OpenAiChatClient {
            http: Client::builder()
                .user_agent("readless-test")
                .build()
                .expect("client"),
            api_key: "test-key".into(),
            base_url,
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
        }
    }

    #[tokio::test]
    async fn complete_returns_first_choice_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .json_body_partial(r#"{ "model": "gpt-4o-mini" }"#);
                then.status(200).json_body(serde_json::json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "Rendered answer" } }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let text = client.complete("prompt text").await.expect("completion");

        mock.assert();
        assert_eq!(text, "Rendered answer");
    }

    #[tokio::test]
    async fn complete_maps_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500).body("upstream blew up");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.complete("prompt").await.expect_err("api error");

        assert!(matches!(
            error,
            CompletionError::Api { status, .. } if status.as_u16() == 500
        ));
    }

    #[tokio::test]
    async fn complete_rejects_missing_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .json_body(serde_json::json!({ "choices": [] }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.complete("prompt").await.expect_err("empty choices");

        assert!(matches!(error, CompletionError::EmptyCompletion));
    }
}
