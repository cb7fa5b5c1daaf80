//! In-process vector index for tests and offline runs.

use crate::rag::search::SearchFilter;
use crate::types::{
    EntityProfile, IndexEntry, IndexHealth, IndexStats, RetrievalResult, RetrievedEntity,
};
use crate::vector_index::{cosine_similarity, VectorIndex};
use sales_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct StoredPoint {
    profile: EntityProfile,
    vector: Vec<f32>,
    /// Upsert sequence number; higher is more recent
    seq: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    points: HashMap<String, StoredPoint>,
    next_seq: u64,
    dimension: Option<usize>,
}

/// Brute-force cosine search over a map guarded by a `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: RwLock<MemoryState>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| AppError::Other("Memory index lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| AppError::Other("Memory index lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl VectorIndex for MemoryIndex {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn ensure_collection(&self, dimension: usize) -> AppResult<()> {
        let mut state = self.write()?;
        match state.dimension {
            Some(existing) if existing != dimension => Err(AppError::Validation(format!(
                "Index holds {}-dimensional vectors, got {}",
                existing, dimension
            ))),
            _ => {
                state.dimension = Some(dimension);
                Ok(())
            }
        }
    }

    async fn upsert(&self, profile: &EntityProfile, vector: &[f32]) -> AppResult<()> {
        let mut state = self.write()?;
        if let Some(dimension) = state.dimension {
            if vector.len() != dimension {
                return Err(AppError::Validation(format!(
                    "Vector for {} has {} dimensions, index expects {}",
                    profile.id,
                    vector.len(),
                    dimension
                )));
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.points.insert(
            profile.id.clone(),
            StoredPoint {
                profile: profile.clone(),
                vector: vector.to_vec(),
                seq,
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> AppResult<RetrievalResult> {
        let state = self.read()?;

        let mut hits: Vec<(f32, u64, &EntityProfile)> = state
            .points
            .values()
            .filter(|p| filter.map_or(true, |f| f.matches(&p.profile)))
            .map(|p| (cosine_similarity(vector, &p.vector), p.seq, &p.profile))
            .filter(|(score, _, _)| filter.map_or(true, |f| f.accepts_score(*score)))
            .collect();

        hits.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
        hits.truncate(top_k);

        Ok(RetrievalResult::new(
            hits.into_iter()
                .map(|(score, _, profile)| RetrievedEntity {
                    profile: profile.clone(),
                    score,
                })
                .collect(),
        ))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        self.write()?.points.remove(id);
        Ok(())
    }

    async fn list_entries(&self) -> AppResult<Vec<IndexEntry>> {
        let state = self.read()?;
        let mut entries: Vec<IndexEntry> = state
            .points
            .values()
            .map(|p| IndexEntry {
                id: p.profile.id.clone(),
                content_hash: p.profile.content_hash.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(entries)
    }

    async fn stats(&self) -> AppResult<IndexStats> {
        let state = self.read()?;
        let mut stats = IndexStats::default();
        for p in state.points.values() {
            stats.add(p.profile.entity_type, 1);
        }
        Ok(stats)
    }

    async fn reset(&self) -> AppResult<()> {
        let mut state = self.write()?;
        *state = MemoryState::default();
        Ok(())
    }

    async fn health(&self) -> IndexHealth {
        IndexHealth {
            backend: "memory".to_string(),
            reachable: true,
            collection_exists: true,
        }
    }
}
