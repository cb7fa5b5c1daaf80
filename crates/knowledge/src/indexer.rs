//! Write path: embed profiles and keep the vector index in step with them.

use crate::embeddings::EmbeddingClient;
use crate::types::EntityProfile;
use crate::vector_index::VectorIndex;
use futures::stream::{self, StreamExt, TryStreamExt};
use sales_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Profiles embedded and upserted
    pub upserted: usize,
    /// Profiles whose content hash matched the stored one
    pub unchanged: usize,
    /// Stored entities with no matching profile, deleted
    pub removed: usize,
    pub duration_secs: f64,
}

pub struct Indexer {
    embeddings: EmbeddingClient,
    index: Arc<dyn VectorIndex>,
    upsert_concurrency: usize,
}

impl Indexer {
    pub fn new(
        embeddings: EmbeddingClient,
        index: Arc<dyn VectorIndex>,
        upsert_concurrency: usize,
    ) -> Self {
        Self {
            embeddings,
            index,
            upsert_concurrency: upsert_concurrency.max(1),
        }
    }

    /// Embed and upsert every profile whose content changed.
    ///
    /// Entities already stored with the same content hash are skipped.
    pub async fn index_profiles(&self, profiles: &[EntityProfile]) -> AppResult<IndexReport> {
        let start = Instant::now();
        check_unique_ids(profiles)?;

        self.index
            .ensure_collection(self.embeddings.dimension())
            .await?;

        let stored: HashMap<String, String> = self
            .index
            .list_entries()
            .await?
            .into_iter()
            .map(|e| (e.id, e.content_hash))
            .collect();

        let changed: Vec<&EntityProfile> = profiles
            .iter()
            .filter(|p| stored.get(&p.id) != Some(&p.content_hash))
            .collect();
        let unchanged = profiles.len() - changed.len();

        tracing::info!(
            "Indexing {} profiles ({} changed, {} unchanged)",
            profiles.len(),
            changed.len(),
            unchanged
        );

        let texts: Vec<String> = changed.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embeddings.embed(&texts).await?;

        let index = &self.index;
        stream::iter(changed.iter().zip(vectors.iter()))
            .map(|(profile, vector)| async move {
                index.upsert(profile, vector).await?;
                tracing::debug!("Upserted {}", profile.id);
                Ok::<_, AppError>(())
            })
            .buffer_unordered(self.upsert_concurrency)
            .try_collect::<Vec<()>>()
            .await?;

        Ok(IndexReport {
            upserted: changed.len(),
            unchanged,
            removed: 0,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Index `profiles` and delete stored entities that are not among them.
    pub async fn sync(&self, profiles: &[EntityProfile]) -> AppResult<IndexReport> {
        let start = Instant::now();
        let mut report = self.index_profiles(profiles).await?;

        let wanted: HashSet<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        let orphans: Vec<String> = self
            .index
            .list_entries()
            .await?
            .into_iter()
            .map(|e| e.id)
            .filter(|id| !wanted.contains(id.as_str()))
            .collect();

        for id in &orphans {
            self.index.delete(id).await?;
            tracing::debug!("Removed stale entity {}", id);
        }

        report.removed = orphans.len();
        report.duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Index sync complete: {} upserted, {} unchanged, {} removed in {:.2}s",
            report.upserted,
            report.unchanged,
            report.removed,
            report.duration_secs
        );
        Ok(report)
    }

    /// Drop everything and index `profiles` from scratch.
    pub async fn rebuild(&self, profiles: &[EntityProfile]) -> AppResult<IndexReport> {
        tracing::info!("Rebuilding index from {} profiles", profiles.len());
        self.index.reset().await?;
        self.index_profiles(profiles).await
    }

    /// Delete one entity from the index.
    pub async fn remove(&self, id: &str) -> AppResult<()> {
        self.index.delete(id).await
    }
}

fn check_unique_ids(profiles: &[EntityProfile]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for p in profiles {
        if !seen.insert(p.id.as_str()) {
            return Err(AppError::Validation(format!(
                "Duplicate entity id in batch: {}",
                p.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_index::MemoryIndex;
    use crate::types::EntityType;
    use sales_core::config::EmbeddingSettings;
    use std::collections::BTreeMap;

    fn indexer() -> (Indexer, Arc<MemoryIndex>) {
        let settings = EmbeddingSettings {
            provider: "mock".to_string(),
            dimension: 64,
            ..EmbeddingSettings::default()
        };
        let embeddings = EmbeddingClient::from_settings(&settings, None).unwrap();
        let index = Arc::new(MemoryIndex::new());
        (Indexer::new(embeddings, index.clone(), 4), index)
    }

    fn customer(name: &str, text: &str) -> EntityProfile {
        EntityProfile::new(EntityType::Customer, name, text, BTreeMap::new())
    }

    #[tokio::test]
    async fn test_index_skips_unchanged_profiles() {
        let (indexer, index) = indexer();
        let profiles = vec![customer("Acme", "Acme buys cars"), customer("Bolt Inc", "Bolt buys ships")];

        let first = indexer.index_profiles(&profiles).await.unwrap();
        assert_eq!(first.upserted, 2);

        let second = indexer.index_profiles(&profiles).await.unwrap();
        assert_eq!(second.upserted, 0);
        assert_eq!(second.unchanged, 2);

        let edited = vec![customer("Acme", "Acme buys planes"), profiles[1].clone()];
        let third = indexer.index_profiles(&edited).await.unwrap();
        assert_eq!(third.upserted, 1);
        assert_eq!(index.stats().await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_sync_prunes_orphans() {
        let (indexer, index) = indexer();
        indexer
            .index_profiles(&[customer("Acme", "Acme buys cars"), customer("Gone Ltd", "Gone")])
            .await
            .unwrap();

        let report = indexer.sync(&[customer("Acme", "Acme buys cars")]).await.unwrap();
        assert_eq!(report.removed, 1);

        let ids: Vec<String> = index
            .list_entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["customer:Acme"]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected_before_writes() {
        let (indexer, index) = indexer();
        let err = indexer
            .index_profiles(&[customer("Acme", "a"), customer("Acme", "b")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(index.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_remove_and_rebuild() {
        let (indexer, index) = indexer();
        let profiles = vec![customer("Acme", "Acme buys cars"), customer("Bolt Inc", "Bolt buys ships")];
        indexer.index_profiles(&profiles).await.unwrap();

        indexer.remove("customer:Acme").await.unwrap();
        assert_eq!(index.stats().await.unwrap().total, 1);

        let report = indexer.rebuild(&profiles).await.unwrap();
        assert_eq!(report.upserted, 2);
    }
}
