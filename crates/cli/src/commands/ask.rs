//! Agent task commands: one subcommand per task.

use super::print_json;
use clap::Args;
use sales_agent::{AgentResponse, SalesAgent, TaskRequest};
use sales_core::{config::AppConfig, AppResult};
use sales_knowledge::RetrievalScope;

/// Ask a free-form sales question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Only use customers and territories of this territory as context
    #[arg(short, long)]
    pub territory: Option<String>,

    /// Customers to retrieve
    #[arg(long)]
    pub customers: Option<usize>,

    /// Products to retrieve
    #[arg(long)]
    pub products: Option<usize>,

    /// Territories to retrieve
    #[arg(long)]
    pub territories: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let request = TaskRequest::GeneralQuery {
            query: self.query.clone(),
            scope: self.scope(config),
            territory: self.territory.clone(),
        };
        run(config, request, self.json).await
    }

    /// Per-type limits when any was given on the command line.
    fn scope(&self, config: &AppConfig) -> Option<RetrievalScope> {
        if self.customers.is_none() && self.products.is_none() && self.territories.is_none() {
            return None;
        }
        let base = RetrievalScope::from_settings(&config.retrieval);
        Some(RetrievalScope {
            customers: self.customers.unwrap_or(base.customers),
            products: self.products.unwrap_or(base.products),
            territories: self.territories.unwrap_or(base.territories),
        })
    }
}

/// Analyze one customer
#[derive(Args, Debug)]
pub struct CustomerCommand {
    /// Customer name (case-insensitive, partial match)
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CustomerCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing customer command for '{}'", self.name);
        let request = TaskRequest::CustomerAnalysis {
            customer: self.name.clone(),
        };
        run(config, request, self.json).await
    }
}

/// Recommend products
#[derive(Args, Debug)]
pub struct RecommendCommand {
    /// Customer profile or criteria, e.g. "large deals in EMEA"
    pub criteria: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RecommendCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing recommend command");
        let request = TaskRequest::ProductRecommendation {
            criteria: self.criteria.clone(),
        };
        run(config, request, self.json).await
    }
}

/// Analyze one territory
#[derive(Args, Debug)]
pub struct TerritoryCommand {
    /// Territory name (e.g. EMEA, NA, APAC, Japan)
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TerritoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing territory command for '{}'", self.name);
        let request = TaskRequest::TerritoryAnalysis {
            territory: self.name.clone(),
        };
        run(config, request, self.json).await
    }
}

/// Write a sales pitch
#[derive(Args, Debug)]
pub struct PitchCommand {
    /// Customer the pitch is for
    pub customer: String,

    /// Product line or product to focus on
    #[arg(short, long)]
    pub focus: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PitchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing pitch command for '{}'", self.customer);
        let request = TaskRequest::PitchGeneration {
            customer: self.customer.clone(),
            product_focus: self.focus.clone(),
        };
        run(config, request, self.json).await
    }
}

async fn run(config: &AppConfig, request: TaskRequest, json: bool) -> AppResult<()> {
    config.validate()?;
    let agent = SalesAgent::from_config(config)?;
    let response = agent.handle(request).await?;

    if json {
        print_json(&response)
    } else {
        print_response(&response);
        Ok(())
    }
}

fn print_response(response: &AgentResponse) {
    println!("{}", response.answer);
    println!();

    if response.context_ids.is_empty() {
        println!("Sources: (no matching sales data)");
    } else {
        println!("Sources:");
        for id in &response.context_ids {
            println!("- {}", id);
        }
    }

    if response.low_confidence {
        println!();
        println!("Note: low confidence, the sales data only weakly supports this answer.");
    }
    if response.truncated {
        println!("Note: the answer was cut at the model's token limit.");
    }

    tracing::debug!(
        "Request {} answered by {} (top score: {:?})",
        response.request_id,
        response.model,
        response.top_score
    );
}
