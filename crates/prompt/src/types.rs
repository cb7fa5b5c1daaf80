//! Prompt types for the Smart Sales Agent.

use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Instruction template for one task (Handlebars syntax).
///
/// The user template receives `query` and `context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

/// One retrieved entity as seen by the composer, in rank order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Entity id (`"<type>:<key>"`)
    pub id: String,

    /// Entity type tag: customer, product or territory
    pub kind: String,

    pub key: String,

    /// Similarity to the query
    pub score: f32,

    /// Descriptive text that was embedded
    pub text: String,

    /// Flat metadata used for per-type facts
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// A fully composed prompt ready for the completion client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedPrompt {
    pub task: TaskKind,

    /// System instructions
    pub system: String,

    /// User message: query plus context section
    pub user: String,

    /// Context entries that made it into the prompt, in rank order
    pub included_ids: Vec<String>,

    /// Entries dropped to respect the context budget
    pub dropped_ids: Vec<String>,

    /// Length of the rendered context section, in characters
    pub context_chars: usize,

    pub low_confidence: bool,
}

impl fmt::Display for ComposedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\n{}", self.system, self.user)
    }
}
