//! Prompt composition for the Smart Sales Agent.
//!
//! This crate turns a task, a user query and ranked context into the
//! system/user message pair sent to the completion service:
//! - A closed set of tasks ([`TaskKind`]) with built-in Handlebars templates
//! - Per-task YAML overrides loaded from the workspace
//! - A character budget on the context section

pub mod builder;
pub mod loader;
pub mod task;
pub mod types;

pub use builder::{format_entry, is_low_confidence, PromptComposer};
pub use loader::TemplateSet;
pub use task::TaskKind;
pub use types::{ComposedPrompt, ContextEntry, PromptTemplate};
