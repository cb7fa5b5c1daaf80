//! Stats and health command handlers.

use super::{load_catalog, open_index, print_json};
use clap::Args;
use sales_core::format::format_currency;
use sales_core::{config::AppConfig, AppResult};
use serde_json::json;
use std::path::PathBuf;

/// Show index and dataset statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Sales CSV (default: configured dataPath)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let index = open_index(config)?;
        let stats = index.stats().await?;

        // Dataset counters are optional: the index may be queried without a local CSV.
        let dataset = if self.data.is_some() || config.data_path.is_some() {
            Some(load_catalog(config, self.data.as_deref())?.summary())
        } else {
            None
        };

        if self.json {
            return print_json(&json!({
                "backend": index.backend(),
                "collection": config.vector_store.collection,
                "index": stats,
                "dataset": dataset,
            }));
        }

        println!(
            "Index ({} / {}): {} entities",
            index.backend(),
            config.vector_store.collection,
            stats.total
        );
        println!("  customers:   {}", stats.customers);
        println!("  products:    {}", stats.products);
        println!("  territories: {}", stats.territories);

        if let Some(d) = dataset {
            println!();
            println!(
                "Dataset: {} records, {} total sales",
                d.records,
                format_currency(d.total_sales)
            );
            println!(
                "  {} customers, {} products, {} territories",
                d.customers, d.products, d.territories
            );
            println!(
                "  {} duplicates removed, {} rows rejected",
                d.duplicates_removed, d.rows_rejected
            );
        }

        Ok(())
    }
}

/// Check the vector store and configured providers
#[derive(Args, Debug)]
pub struct HealthCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HealthCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing health command");

        let health = open_index(config)?.health().await;
        let config_error = config.validate().err().map(|e| e.to_string());

        if self.json {
            return print_json(&json!({
                "vectorStore": health,
                "completion": {
                    "provider": config.completion.provider,
                    "model": config.completion.model,
                },
                "embedding": {
                    "provider": config.embedding.provider,
                    "model": config.embedding.model,
                    "dimension": config.embedding.dimension,
                },
                "configError": config_error,
            }));
        }

        println!(
            "Vector store ({}): {}{}",
            health.backend,
            if health.reachable { "reachable" } else { "unreachable" },
            if health.reachable && !health.collection_exists {
                format!(" (collection '{}' missing, run `sales ingest`)", config.vector_store.collection)
            } else {
                String::new()
            }
        );
        println!(
            "Completion: {} ({})",
            config.completion.provider, config.completion.model
        );
        println!(
            "Embeddings: {} ({}, {} dims)",
            config.embedding.provider, config.embedding.model, config.embedding.dimension
        );
        match config_error {
            Some(e) => println!("Configuration: {}", e),
            None => println!("Configuration: ok"),
        }

        Ok(())
    }
}
