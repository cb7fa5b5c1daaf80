//! Vector index abstraction for entity profiles.
//!
//! Defines a trait for backend-agnostic vector storage and retrieval.

use crate::memory_index::MemoryIndex;
use crate::qdrant_index::QdrantIndex;
use crate::rag::search::SearchFilter;
use crate::types::{EntityProfile, IndexEntry, IndexHealth, IndexStats, RetrievalResult};
use sales_core::config::VectorStoreSettings;
use sales_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for vector index backends.
///
/// Search results are ordered by descending cosine similarity; equal scores
/// put the most recently upserted entity first. Backends report an
/// unreachable store as `AppError::IndexUnavailable` and do not retry.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name ("memory", "qdrant")
    fn backend(&self) -> &str;

    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self, dimension: usize) -> AppResult<()>;

    /// Insert or replace the vector and payload stored under `profile.id`.
    async fn upsert(&self, profile: &EntityProfile, vector: &[f32]) -> AppResult<()>;

    /// Top `top_k` profiles most similar to `vector`.
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<RetrievalResult>;

    /// Remove the entity; absent ids are a no-op.
    async fn delete(&self, id: &str) -> AppResult<()>;

    /// Every stored id with its content hash.
    async fn list_entries(&self) -> AppResult<Vec<IndexEntry>>;

    /// Point counts, total and per type.
    async fn stats(&self) -> AppResult<IndexStats>;

    /// Remove every stored entity.
    async fn reset(&self) -> AppResult<()>;

    /// Probe the store; never fails.
    async fn health(&self) -> IndexHealth;
}

/// Create the configured vector index backend.
pub fn create_index(
    settings: &VectorStoreSettings,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn VectorIndex>> {
    match settings.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryIndex::new())),
        "qdrant" => {
            let index = QdrantIndex::new(&settings.url, &settings.collection, api_key)
                .with_timeout(Duration::from_secs(settings.timeout_secs))?;
            Ok(Arc::new(index))
        }
        other => Err(AppError::Config(format!(
            "Unknown vector store backend: '{}'. Supported backends: qdrant, memory",
            other
        ))),
    }
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_create_index_backends() {
        let memory = VectorStoreSettings {
            backend: "memory".to_string(),
            ..VectorStoreSettings::default()
        };
        assert_eq!(create_index(&memory, None).unwrap().backend(), "memory");

        let qdrant = VectorStoreSettings::default();
        assert_eq!(create_index(&qdrant, None).unwrap().backend(), "qdrant");

        let unknown = VectorStoreSettings {
            backend: "lancedb".to_string(),
            ..VectorStoreSettings::default()
        };
        assert!(matches!(
            create_index(&unknown, None),
            Err(AppError::Config(_))
        ));
    }
}
