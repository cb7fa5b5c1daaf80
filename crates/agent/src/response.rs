//! The agent's answer and its provenance.

use chrono::{DateTime, Utc};
use sales_prompt::TaskKind;
use serde::{Deserialize, Serialize};

/// Result of one agent request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub request_id: String,
    pub task: TaskKind,
    /// Query text sent to retrieval and the prompt
    pub query: String,
    /// Entities included in the prompt, in rank order
    pub context_ids: Vec<String>,
    pub answer: String,
    /// Answer is weakly grounded or not grounded at all
    pub low_confidence: bool,
    /// The model stopped at its token limit
    pub truncated: bool,
    pub top_score: Option<f32>,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    /// Ids of context entities of one type tag (`customer`, `product`, `territory`).
    pub fn context_ids_of(&self, kind: &str) -> Vec<&str> {
        let prefix = format!("{}:", kind);
        self.context_ids
            .iter()
            .filter(|id| id.starts_with(&prefix))
            .map(String::as_str)
            .collect()
    }
}
