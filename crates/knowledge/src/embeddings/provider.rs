//! Embedding provider trait and factory.

use super::providers::{MockProvider, OllamaEmbeddings, OpenAiEmbeddings};
use sales_core::config::EmbeddingSettings;
use sales_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Trait for embedding providers.
///
/// Implementations make exactly one call per `embed_batch`; batching, retry
/// and dimension checks live in [`super::EmbeddingClient`].
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Embed every text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    let timeout = Duration::from_secs(settings.timeout_secs);

    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimension))),

        "ollama" => {
            let url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
            let provider = OllamaEmbeddings::new(url, &settings.model).with_timeout(timeout)?;
            Ok(Arc::new(provider))
        }

        "openai" => {
            let key = api_key.ok_or_else(|| {
                AppError::Config(
                    "The openai embedding provider requires an API key (set embedding.apiKeyEnv)"
                        .to_string(),
                )
            })?;
            let url = settings.endpoint.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
            let provider =
                OpenAiEmbeddings::new(url, &settings.model, key).with_timeout(timeout)?;
            Ok(Arc::new(provider))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama, openai",
            other
        ))),
    }
}
