//! Typed agent requests, one variant per task.

use sales_core::{AppError, AppResult};
use sales_knowledge::RetrievalScope;
use sales_prompt::TaskKind;
use serde::{Deserialize, Serialize};

/// A request to the sales agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskRequest {
    /// Free-form question over every entity type
    GeneralQuery {
        query: String,
        /// Per-type limits; the configured scope when unset
        #[serde(default)]
        scope: Option<RetrievalScope>,
        /// Restrict context to entities of this territory
        #[serde(default)]
        territory: Option<String>,
    },
    CustomerAnalysis {
        customer: String,
    },
    ProductRecommendation {
        criteria: String,
    },
    TerritoryAnalysis {
        territory: String,
    },
    PitchGeneration {
        customer: String,
        #[serde(default)]
        product_focus: Option<String>,
    },
}

impl TaskRequest {
    pub fn general(query: impl Into<String>) -> Self {
        TaskRequest::GeneralQuery {
            query: query.into(),
            scope: None,
            territory: None,
        }
    }

    pub fn task(&self) -> TaskKind {
        match self {
            TaskRequest::GeneralQuery { .. } => TaskKind::GeneralQuery,
            TaskRequest::CustomerAnalysis { .. } => TaskKind::CustomerAnalysis,
            TaskRequest::ProductRecommendation { .. } => TaskKind::ProductRecommendation,
            TaskRequest::TerritoryAnalysis { .. } => TaskKind::TerritoryAnalysis,
            TaskRequest::PitchGeneration { .. } => TaskKind::PitchGeneration,
        }
    }

    /// Trim every field; reject blank required fields.
    ///
    /// Blank optional fields become `None`.
    pub fn normalized(self) -> AppResult<Self> {
        Ok(match self {
            TaskRequest::GeneralQuery {
                query,
                scope,
                territory,
            } => TaskRequest::GeneralQuery {
                query: required("query", query)?,
                scope,
                territory: optional(territory),
            },
            TaskRequest::CustomerAnalysis { customer } => TaskRequest::CustomerAnalysis {
                customer: required("customer name", customer)?,
            },
            TaskRequest::ProductRecommendation { criteria } => {
                TaskRequest::ProductRecommendation {
                    criteria: required("criteria", criteria)?,
                }
            }
            TaskRequest::TerritoryAnalysis { territory } => TaskRequest::TerritoryAnalysis {
                territory: required("territory name", territory)?,
            },
            TaskRequest::PitchGeneration {
                customer,
                product_focus,
            } => TaskRequest::PitchGeneration {
                customer: required("customer name", customer)?,
                product_focus: optional(product_focus),
            },
        })
    }

    /// Text used both to search the index and as the prompt's query.
    pub fn query(&self) -> String {
        match self {
            TaskRequest::GeneralQuery { query, .. } => query.clone(),
            TaskRequest::CustomerAnalysis { customer } => {
                format!("Complete analysis of customer {}", customer)
            }
            TaskRequest::ProductRecommendation { criteria } => {
                format!("Recommended products for {}", criteria)
            }
            TaskRequest::TerritoryAnalysis { territory } => {
                format!("Analysis of territory {}", territory)
            }
            TaskRequest::PitchGeneration {
                customer,
                product_focus: Some(focus),
            } => format!("Sales pitch for {} focusing on {}", customer, focus),
            TaskRequest::PitchGeneration { customer, .. } => {
                format!("Sales pitch for {}", customer)
            }
        }
    }
}

fn required(field: &str, value: String) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }
    Ok(value.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
