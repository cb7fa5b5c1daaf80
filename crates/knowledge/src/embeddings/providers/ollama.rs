//! Ollama embedding provider.
//!
//! Uses the batch endpoint `POST /api/embed`, which takes a list of inputs
//! and returns one vector per input in the same order.

use super::{http_client, send_error, status_error};
use crate::embeddings::provider::EmbeddingProvider;
use sales_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBED_ENDPOINT: &str = "/api/embed";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Error response from Ollama API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Ollama embedding provider using the local API.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddings {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Bound every HTTP call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbeddings {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "ollama", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}{}", self.base_url, EMBED_ENDPOINT);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| send_error("Ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(status_error("Ollama", status, &message));
        }

        let body: EmbedResponse = response.json().await.map_err(|e| {
            AppError::embedding(format!("Failed to parse Ollama embedding response: {}", e))
        })?;

        Ok(body.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_embed_batch_posts_all_inputs() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embed")
            .match_body(Matcher::Regex(r#""input":\["a","b"\]"#.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model":"all-minilm","embeddings":[[0.1,0.2],[0.3,0.4]]}"#)
            .create_async()
            .await;

        let provider = OllamaEmbeddings::new(server.url(), "all-minilm");
        let vectors = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_model_is_permanent() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(404)
            .with_body(r#"{"error":"model \"nope\" not found, try pulling it first"}"#)
            .create_async()
            .await;

        let provider = OllamaEmbeddings::new(server.url(), "nope");
        let err = provider.embed_batch(&["a".to_string()]).await.unwrap_err();

        assert!(matches!(err, AppError::EmbeddingService { transient: false, .. }));
        assert!(err.to_string().contains("try pulling it first"));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = OllamaEmbeddings::new(server.url(), "all-minilm");
        let err = provider.embed_batch(&["a".to_string()]).await.unwrap_err();
        assert!(err.is_transient());
    }
}
