//! Completion provider factory.
//!
//! Builds the configured [`LlmClient`] with its endpoint, key, per-call
//! timeout and retry policy applied.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use sales_core::config::CompletionSettings;
use sales_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create a completion client from settings.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a hosted
/// provider has no API key.
pub fn create_client(
    settings: &CompletionSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider = ProviderType::parse(&settings.provider).ok_or_else(|| {
        AppError::Config(format!(
            "Unknown completion provider: {}. Supported: groq, openai, ollama",
            settings.provider
        ))
    })?;

    let endpoint = settings
        .endpoint
        .as_deref()
        .unwrap_or(provider.default_endpoint());
    let timeout = Duration::from_secs(settings.timeout_secs);

    tracing::debug!(
        "Creating {} completion client at {} (model: {})",
        provider.as_str(),
        endpoint,
        settings.model
    );

    match provider {
        ProviderType::Ollama => {
            let client = OllamaClient::with_base_url(endpoint)
                .with_timeout(timeout)?
                .with_retry(settings.retry);
            Ok(Arc::new(client))
        }
        ProviderType::Groq | ProviderType::OpenAI => {
            let key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
                AppError::Config(format!(
                    "{} provider requires an API key (set {})",
                    provider.as_str(),
                    settings.api_key_env
                ))
            })?;
            let client = OpenAiClient::with_base_url(provider, endpoint, key)
                .with_timeout(timeout)?
                .with_retry(settings.retry);
            Ok(Arc::new(client))
        }
    }
}
