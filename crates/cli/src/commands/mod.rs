//! Command handlers for the Smart Sales Agent CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod catalog;
pub mod ingest;
pub mod stats;

pub use ask::{AskCommand, CustomerCommand, PitchCommand, RecommendCommand, TerritoryCommand};
pub use catalog::{TerritoriesCommand, TopCommand};
pub use ingest::IngestCommand;
pub use stats::{HealthCommand, StatsCommand};

use sales_core::{config::AppConfig, AppError, AppResult};
use sales_knowledge::{create_index, Catalog, VectorIndex};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Dataset path from the flag, else from configuration.
pub fn data_path(config: &AppConfig, flag: Option<&Path>) -> AppResult<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| config.resolved_data_path())
        .ok_or_else(|| {
            AppError::Config(
                "No sales dataset configured. Pass --data or set SALES_DATA_PATH".to_string(),
            )
        })
}

pub fn load_catalog(config: &AppConfig, flag: Option<&Path>) -> AppResult<Catalog> {
    let path = data_path(config, flag)?;
    tracing::info!("Loading sales dataset from {:?}", path);
    Catalog::load(&path)
}

pub fn open_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    create_index(
        &config.vector_store,
        config.resolve_vector_store_key().as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_path_prefers_flag() {
        let config = AppConfig {
            data_path: Some(PathBuf::from("configured.csv")),
            ..AppConfig::default()
        };
        let path = data_path(&config, Some(Path::new("/tmp/flag.csv"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/flag.csv"));

        let path = data_path(&config, None).unwrap();
        assert!(path.ends_with("configured.csv"));
    }

    #[test]
    fn test_missing_data_path_is_config_error() {
        let config = AppConfig::default();
        let err = data_path(&config, None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
