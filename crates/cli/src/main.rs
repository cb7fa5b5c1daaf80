//! Smart Sales Agent CLI
//!
//! Main entry point for the `sales` command-line tool.
//! Answers sales questions grounded in the indexed sales dataset.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CustomerCommand, HealthCommand, IngestCommand, PitchCommand, RecommendCommand,
    StatsCommand, TerritoriesCommand, TerritoryCommand, TopCommand,
};
use sales_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Smart Sales Agent - answers sales questions from your sales data
#[derive(Parser, Debug)]
#[command(name = "sales")]
#[command(about = "Answers sales questions grounded in your sales data", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SALES_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SALES_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider (groq, openai, ollama)
    #[arg(short, long, global = true, env = "SALES_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "SALES_LLM_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a free-form sales question
    Ask(AskCommand),

    /// Analyze one customer
    Customer(CustomerCommand),

    /// Recommend products for a customer profile or criteria
    Recommend(RecommendCommand),

    /// Analyze one territory
    Territory(TerritoryCommand),

    /// Write a sales pitch for a customer
    Pitch(PitchCommand),

    /// Load the sales CSV and index its profiles
    Ingest(IngestCommand),

    /// Show index and dataset statistics
    Stats(StatsCommand),

    /// Rank customers or products from the dataset
    Top(TopCommand),

    /// Per-territory breakdown of the dataset
    Territories(TerritoriesCommand),

    /// Check the vector store and configured providers
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Customer(_) => "customer",
            Commands::Recommend(_) => "recommend",
            Commands::Territory(_) => "territory",
            Commands::Pitch(_) => "pitch",
            Commands::Ingest(_) => "ingest",
            Commands::Stats(_) => "stats",
            Commands::Top(_) => "top",
            Commands::Territories(_) => "territories",
            Commands::Health(_) => "health",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration: defaults, config file, environment
    let config = AppConfig::load_with(cli.workspace, cli.config, |key| std::env::var(key).ok())?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.logging.level.as_deref(), config.logging.no_color)?;

    tracing::info!("Smart Sales Agent CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "Completion: {} ({})",
        config.completion.provider,
        config.completion.model
    );
    tracing::debug!("Vector store: {}", config.vector_store.backend);

    config.ensure_sales_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Customer(cmd) => cmd.execute(&config).await,
        Commands::Recommend(cmd) => cmd.execute(&config).await,
        Commands::Territory(cmd) => cmd.execute(&config).await,
        Commands::Pitch(cmd) => cmd.execute(&config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
        Commands::Top(cmd) => cmd.execute(&config),
        Commands::Territories(cmd) => cmd.execute(&config),
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed ({}): {}", e.status_code(), e),
    }

    result
}
