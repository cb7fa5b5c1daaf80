//! Embedding client.
//!
//! Splits texts into batches, sends them to the configured provider with
//! bounded concurrency and retry, and checks every returned vector.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use futures::stream::{self, StreamExt, TryStreamExt};
use sales_core::config::EmbeddingSettings;
use sales_core::{AppError, AppResult, RetryPolicy};
use std::ops::Range;
use std::sync::Arc;

/// Provider-agnostic embedding entry point.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    dimension: usize,
    batch_size: usize,
    max_batch_chars: usize,
    concurrency: usize,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    /// Wrap `provider` with the batching and retry limits from `settings`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: &EmbeddingSettings) -> Self {
        Self {
            provider,
            dimension: settings.dimension,
            batch_size: settings.batch_size.max(1),
            max_batch_chars: settings.max_batch_chars.max(1),
            concurrency: settings.concurrency.max(1),
            retry: settings.retry,
        }
    }

    /// Create the configured provider and wrap it.
    pub fn from_settings(settings: &EmbeddingSettings, api_key: Option<&str>) -> AppResult<Self> {
        let provider = create_provider(settings, api_key)?;
        tracing::debug!(
            "Embedding provider={}, model={}, dimension={}",
            provider.provider_name(),
            provider.model_name(),
            settings.dimension
        );
        Ok(Self::new(provider, settings))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed `texts`; the output has one vector per input, in input order.
    pub async fn embed(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(i) = texts.iter().position(|t| t.trim().is_empty()) {
            return Err(AppError::embedding(format!(
                "Cannot embed empty text (input {})",
                i
            )));
        }

        let batches = plan_batches(texts, self.batch_size, self.max_batch_chars);
        tracing::info!(
            "Embedding {} texts in {} batches using provider '{}' (model: {})",
            texts.len(),
            batches.len(),
            self.provider.provider_name(),
            self.provider.model_name()
        );

        let results: Vec<Vec<Vec<f32>>> = stream::iter(batches)
            .map(|range| self.embed_batch(&texts[range]))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(results.into_iter().flatten().collect())
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> AppResult<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| AppError::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, batch: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let provider = &self.provider;
        let vectors = self
            .retry
            .run("embedding batch", move || provider.embed_batch(batch))
            .await?;

        if vectors.len() != batch.len() {
            return Err(AppError::embedding(format!(
                "Provider returned {} embeddings for {} inputs",
                vectors.len(),
                batch.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(AppError::embedding(format!(
                "Unexpected embedding dimension: got {}, expected {}",
                bad.len(),
                self.dimension
            )));
        }

        Ok(vectors)
    }
}

/// Split `texts` into consecutive ranges of at most `batch_size` items and,
/// unless a single text is larger, at most `max_chars` characters.
pub fn plan_batches(texts: &[String], batch_size: usize, max_chars: usize) -> Vec<Range<usize>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut chars = 0;

    for (i, text) in texts.iter().enumerate() {
        let len = text.chars().count();
        let full = i - start >= batch_size || (i > start && chars + len > max_chars);
        if full {
            batches.push(start..i);
            start = i;
            chars = 0;
        }
        chars += len;
    }
    if start < texts.len() {
        batches.push(start..texts.len());
    }

    batches
}
