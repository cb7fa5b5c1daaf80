//! Dataset rankings that need neither the index nor the model.

use super::{load_catalog, print_json};
use clap::{Args, ValueEnum};
use sales_core::format::format_currency;
use sales_core::{config::AppConfig, AppResult};
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopKind {
    Customers,
    Products,
}

/// Rank customers by sales or products by performance
#[derive(Args, Debug)]
pub struct TopCommand {
    /// What to rank
    #[arg(value_enum)]
    pub kind: TopKind,

    /// Number of entries
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Sales CSV (default: configured dataPath)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TopCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing top {:?} command", self.kind);
        let catalog = load_catalog(config, self.data.as_deref())?;

        match self.kind {
            TopKind::Customers => {
                let customers = catalog.top_customers(self.limit);
                if self.json {
                    return print_json(&customers);
                }
                for (rank, c) in customers.iter().enumerate() {
                    println!(
                        "{:>3}. {} - {} over {} orders ({}, {})",
                        rank + 1,
                        c.name,
                        format_currency(c.total_sales),
                        c.total_orders,
                        c.territory.as_deref().unwrap_or("no territory"),
                        c.status.as_str()
                    );
                }
            }
            TopKind::Products => {
                let products = catalog.top_products(self.limit);
                if self.json {
                    return print_json(&products);
                }
                for (rank, p) in products.iter().enumerate() {
                    println!(
                        "{:>3}. {} ({}) - score {:.3}, {} in {} orders",
                        rank + 1,
                        p.product_code,
                        p.product_line,
                        p.performance_score,
                        format_currency(p.total_sales),
                        p.order_count
                    );
                }
            }
        }

        Ok(())
    }
}

/// Per-territory breakdown
#[derive(Args, Debug)]
pub struct TerritoriesCommand {
    /// Sales CSV (default: configured dataPath)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TerritoriesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing territories command");
        let insights = load_catalog(config, self.data.as_deref())?.territory_insights();

        if self.json {
            return print_json(&insights);
        }

        println!("Territories: {}", insights.total_territories);
        if let Some(top) = &insights.top_territory {
            println!("Top territory: {} ({})", top.name, format_currency(top.total_sales));
        }
        println!();

        for t in &insights.breakdown {
            let lines: Vec<&str> = t.top_product_lines.iter().map(|(l, _)| l.as_str()).collect();
            println!(
                "{}: {} ({:.2}% share), {} orders, {} customers, top lines: {}",
                t.name,
                format_currency(t.total_sales),
                t.market_share,
                t.total_orders,
                t.unique_customers,
                if lines.is_empty() {
                    "-".to_string()
                } else {
                    lines.join(", ")
                }
            );
        }

        Ok(())
    }
}
