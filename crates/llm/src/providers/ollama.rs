//! Ollama completion provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use super::{send_error, status_error};
use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use sales_core::{AppError, AppResult, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama completion client.
pub struct OllamaClient {
    /// Base URL for Ollama API
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    retry: RetryPolicy,
}

impl OllamaClient {
    /// Create a new Ollama client against http://localhost:11434.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
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

    /// Convert LlmRequest to Ollama format.
    fn to_ollama_request(&self, request: &LlmRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }

    /// Convert Ollama response to LlmResponse.
    fn convert_response(&self, response: OllamaResponse) -> LlmResponse {
        let usage = LlmUsage::new(
            response.prompt_eval_count.unwrap_or(0),
            response.eval_count.unwrap_or(0),
        );

        LlmResponse {
            content: response.response,
            model: response.model,
            usage,
            truncated: response.done_reason.as_deref() == Some("length"),
        }
    }

    async fn complete_once(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&self.to_ollama_request(request))
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("Ollama", status, &error_text));
        }

        let ollama_response: OllamaResponse = response.json().await.map_err(|e| {
            AppError::completion(format!("Failed to parse Ollama response: {}", e))
        })?;

        Ok(self.convert_response(ollama_response))
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(provider = "ollama", model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending completion request to Ollama");

        let response = self
            .retry
            .run("ollama completion", move || self.complete_once(request))
            .await?;

        if response.truncated {
            tracing::warn!("Ollama stopped at the token limit; answer is truncated");
        }
        tracing::debug!(
            "Received completion: {} chars, {} tokens",
            response.content.len(),
            response.usage.total_tokens
        );

        Ok(response)
    }
}
