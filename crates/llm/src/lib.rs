//! Completion client crate for the Smart Sales Agent.
//!
//! Provides a provider-agnostic abstraction over hosted and local large
//! language models. Every provider sits behind the [`LlmClient`] trait and is
//! built from configuration by [`create_client`].
//!
//! # Providers
//! - **Groq / OpenAI**: OpenAI-compatible chat completions (default: Groq)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use sales_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Who are our best customers?", "llama3");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
