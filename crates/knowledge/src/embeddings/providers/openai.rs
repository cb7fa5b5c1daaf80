//! OpenAI-compatible embedding provider (`POST {base}/embeddings`).

use super::{http_client, send_error, status_error};
use crate::embeddings::provider::EmbeddingProvider;
use sales_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiEmbeddings {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> AppResult<Self> {
        self.client = http_client(timeout)?;
        Ok(self)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| send_error("OpenAI", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error("OpenAI", status, &error_text));
        }

        let mut body: EmbeddingsResponse = response.json().await.map_err(|e| {
            AppError::embedding(format!("Failed to parse OpenAI embedding response: {}", e))
        })?;

        // The API may return items out of order
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
