//! Ingest command handler.
//!
//! Loads the sales CSV, aggregates profiles and brings the vector index in
//! line with them.

use super::{data_path, open_index, print_json};
use clap::Args;
use sales_core::{config::AppConfig, AppResult};
use sales_knowledge::{Catalog, EmbeddingClient, Indexer};
use serde_json::json;
use std::path::PathBuf;

/// Load the sales CSV and index its profiles
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Sales CSV (default: configured dataPath)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Drop the collection and index everything from scratch
    #[arg(long)]
    pub rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command");

        let path = data_path(config, self.data.as_deref())?;
        let catalog = Catalog::load(&path)?;
        let profiles = catalog.entity_profiles();
        let summary = catalog.summary();

        let embeddings = EmbeddingClient::from_settings(
            &config.embedding,
            config.resolve_embedding_key().as_deref(),
        )?;
        let indexer = Indexer::new(
            embeddings,
            open_index(config)?,
            config.vector_store.upsert_concurrency,
        );

        let report = if self.rebuild {
            indexer.rebuild(&profiles).await?
        } else {
            indexer.sync(&profiles).await?
        };

        if self.json {
            return print_json(&json!({
                "dataset": summary,
                "index": report,
                "collection": config.vector_store.collection,
            }));
        }

        println!(
            "Loaded {} records from {:?} ({} duplicates removed, {} rows rejected)",
            summary.records, path, summary.duplicates_removed, summary.rows_rejected
        );
        println!(
            "Profiles: {} customers, {} products, {} territories",
            summary.customers, summary.products, summary.territories
        );
        println!(
            "Indexed into '{}': {} upserted, {} unchanged, {} removed in {:.2}s",
            config.vector_store.collection,
            report.upserted,
            report.unchanged,
            report.removed,
            report.duration_secs
        );

        Ok(())
    }
}
