//! Context retrieval: embed the query, search the index.

use crate::embeddings::EmbeddingClient;
use crate::rag::search::SearchFilter;
use crate::types::{EntityType, RetrievalResult};
use crate::vector_index::VectorIndex;
use sales_core::config::RetrievalSettings;
use sales_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Per-type result limits for searches across every entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalScope {
    pub customers: usize,
    pub products: usize,
    pub territories: usize,
}

impl Default for RetrievalScope {
    fn default() -> Self {
        Self {
            customers: 3,
            products: 3,
            territories: 2,
        }
    }
}

impl RetrievalScope {
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        Self {
            customers: settings.customer_limit,
            products: settings.product_limit,
            territories: settings.territory_limit,
        }
    }

    /// Only `entity_type`, with `limit` results.
    pub fn only(entity_type: EntityType, limit: usize) -> Self {
        let mut scope = Self {
            customers: 0,
            products: 0,
            territories: 0,
        };
        match entity_type {
            EntityType::Customer => scope.customers = limit,
            EntityType::Product => scope.products = limit,
            EntityType::Territory => scope.territories = limit,
        }
        scope
    }

    pub fn limit_for(&self, entity_type: EntityType) -> usize {
        match entity_type {
            EntityType::Customer => self.customers,
            EntityType::Product => self.products,
            EntityType::Territory => self.territories,
        }
    }
}

/// Turns a query into ranked entity profiles. Read-only.
#[derive(Clone)]
pub struct ContextRetriever {
    embeddings: EmbeddingClient,
    index: Arc<dyn VectorIndex>,
    /// Applied when a filter does not set its own minimum
    min_score: Option<f32>,
}

impl ContextRetriever {
    pub fn new(embeddings: EmbeddingClient, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embeddings,
            index,
            min_score: None,
        }
    }

    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Top `top_k` entities for `query`, optionally of one type.
    pub async fn retrieve(
        &self,
        query: &str,
        type_filter: Option<EntityType>,
        top_k: usize,
    ) -> AppResult<RetrievalResult> {
        let filter = type_filter.map(SearchFilter::of_type).unwrap_or_default();
        self.retrieve_filtered(query, &filter, top_k).await
    }

    /// Top `top_k` entities for `query` passing `filter`.
    #[instrument(skip(self, query, filter))]
    pub async fn retrieve_filtered(
        &self,
        query: &str,
        filter: &SearchFilter,
        top_k: usize,
    ) -> AppResult<RetrievalResult> {
        let query = validate_query(query)?;
        if top_k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let vector = self.embeddings.embed_one(query).await?;
        let filter = self.effective_filter(filter);
        let result = self.index.search(&vector, top_k, Some(&filter)).await?;

        log_result(&result);
        Ok(result)
    }

    /// Search each entity type with its own limit and merge by score.
    ///
    /// Equal scores keep type order: customers, products, territories.
    #[instrument(skip(self, query, base))]
    pub async fn retrieve_scoped(
        &self,
        query: &str,
        scope: &RetrievalScope,
        base: Option<&SearchFilter>,
    ) -> AppResult<RetrievalResult> {
        let query = validate_query(query)?;
        let base = base.cloned().unwrap_or_default();
        if base.entity_type.is_some() {
            return Err(AppError::Validation(
                "Scoped retrieval sets the entity type itself".to_string(),
            ));
        }

        let types: Vec<EntityType> = EntityType::ALL
            .into_iter()
            .filter(|t| scope.limit_for(*t) > 0)
            .collect();
        if types.is_empty() {
            return Ok(RetrievalResult::empty());
        }

        let vector = self.embeddings.embed_one(query).await?;
        let mut entries = Vec::new();
        for entity_type in types {
            let filter = self.effective_filter(&base.clone().with_type(entity_type));
            let result = self
                .index
                .search(&vector, scope.limit_for(entity_type), Some(&filter))
                .await?;
            entries.extend(result.entries);
        }
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));

        let result = RetrievalResult::new(entries);
        log_result(&result);
        Ok(result)
    }

    fn effective_filter(&self, filter: &SearchFilter) -> SearchFilter {
        let mut filter = filter.clone();
        if filter.min_score.is_none() {
            filter.min_score = self.min_score;
        }
        filter
    }
}

fn validate_query(query: &str) -> AppResult<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("Query cannot be empty".to_string()));
    }
    Ok(query)
}

fn log_result(result: &RetrievalResult) {
    match result.top_score() {
        Some(top) => tracing::info!(
            "Retrieved {} entities (top score: {:.3})",
            result.len(),
            top
        ),
        None => tracing::info!("No matching entities found"),
    }
}
