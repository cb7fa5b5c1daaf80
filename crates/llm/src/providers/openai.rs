//! OpenAI-compatible chat completions provider.
//!
//! Serves both Groq (the default hosted backend) and OpenAI, which share the
//! `/chat/completions` wire format and bearer-token authentication.

use super::{send_error, status_error};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ProviderType;
use sales_core::{AppError, AppResult, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiClient {
    name: &'static str,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAiClient {
    /// Client for `provider` (groq or openai) at its default endpoint.
    pub fn new(provider: ProviderType, api_key: impl Into<String>) -> Self {
        Self::with_base_url(provider, provider.default_endpoint(), api_key)
    }

    pub fn with_base_url(
        provider: ProviderType,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: provider.as_str(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Bound every HTTP call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn to_chat_request<'a>(&self, request: &'a LlmRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, request: &LlmRequest, response: ChatResponse) -> AppResult<LlmResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            AppError::completion(format!("{} returned no choices", self.name))
        })?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let model = if response.model.is_empty() {
            request.model.clone()
        } else {
            response.model
        };

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model,
            usage,
            truncated: choice.finish_reason.as_deref() == Some("length"),
        })
    }

    async fn complete_once(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.to_chat_request(request))
            .send()
            .await
            .map_err(|e| send_error(self.name, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(self.name, status, &error_text));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            AppError::completion(format!("Failed to parse {} response: {}", self.name, e))
        })?;

        self.convert_response(request, body)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        self.name
    }

    #[instrument(skip(self, request), fields(provider = self.name, model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending chat completion request to {}", self.name);

        let label = format!("{} completion", self.name);
        let response = self
            .retry
            .run(&label, move || self.complete_once(request))
            .await?;

        if response.truncated {
            tracing::warn!("{} stopped at the token limit; answer is truncated", self.name);
        }
        tracing::debug!(
            "Received completion: {} chars, {} tokens",
            response.content.len(),
            response.usage.total_tokens
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    fn ok_body(finish_reason: &str) -> String {
        format!(
            r#"{{"model":"llama3-8b-8192","choices":[{{"index":0,"message":{{"role":"assistant","content":"Acme is the top EMEA customer."}},"finish_reason":"{}"}}],"usage":{{"prompt_tokens":40,"completion_tokens":9,"total_tokens":49}}}}"#,
            finish_reason
        )
    }

    #[test]
    fn test_system_message_comes_first() {
        let client = OpenAiClient::new(ProviderType::Groq, "key");
        let request = LlmRequest::new("question", "llama3-8b-8192").with_system("rules");
        let chat = client.to_chat_request(&request);

        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.messages[1].content, "question");
    }

    #[tokio::test]
    async fn test_complete_sends_bearer_and_parses_usage() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk-test")
            .match_body(Matcher::PartialJsonString(
                r#"{"model":"llama3-8b-8192","temperature":0.7}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok_body("stop"))
            .create_async()
            .await;

        let client = OpenAiClient::with_base_url(ProviderType::Groq, server.url(), "gsk-test");
        let request = LlmRequest::new("top customer?", "llama3-8b-8192").with_temperature(0.7);
        let response = client.complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "Acme is the top EMEA customer.");
        assert_eq!(response.usage.total_tokens, 49);
        assert!(!response.truncated);
        assert_eq!(client.provider_name(), "groq");
    }

    #[tokio::test]
    async fn test_finish_reason_length_marks_truncated() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ok_body("length"))
            .create_async()
            .await;

        let client = OpenAiClient::with_base_url(ProviderType::OpenAI, server.url(), "k");
        let response = client
            .complete(&LlmRequest::new("q", "gpt-4o-mini"))
            .await
            .unwrap();

        assert!(response.truncated);
    }

    #[tokio::test]
    async fn test_server_error_is_retried_then_surfaced() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("upstream overloaded")
            .expect(3)
            .create_async()
            .await;

        let client = OpenAiClient::with_base_url(ProviderType::Groq, server.url(), "k")
            .with_retry(fast_retry());
        let err = client
            .complete(&LlmRequest::new("q", "llama3-8b-8192"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.is_transient());
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let client = OpenAiClient::with_base_url(ProviderType::Groq, server.url(), "k")
            .with_retry(fast_retry());
        let err = client
            .complete(&LlmRequest::new("q", "m"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiClient::with_base_url(ProviderType::Groq, server.url(), "bad")
            .with_retry(fast_retry());
        let err = client
            .complete(&LlmRequest::new("q", "m"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(!err.is_transient());
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_no_choices_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"m","choices":[]}"#)
            .create_async()
            .await;

        let client = OpenAiClient::with_base_url(ProviderType::Groq, server.url(), "k");
        let result = client.complete(&LlmRequest::new("q", "m")).await;
        assert!(matches!(result, Err(AppError::CompletionService { .. })));
    }
}
