//! Sales agent orchestration.
//!
//! Each request runs one sequential pipeline: validate the input, retrieve
//! ranked entity profiles, compose the task prompt and ask the completion
//! service. The result is an [`AgentResponse`] carrying the answer together
//! with the context it was grounded on.
//!
//! # Example
//! ```no_run
//! use sales_agent::SalesAgent;
//! use sales_core::AppConfig;
//!
//! # async fn example() -> sales_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let agent = SalesAgent::from_config(&config)?;
//! let response = agent
//!     .general_query("Who is our top customer?", None, Some("EMEA"))
//!     .await?;
//! println!("{}", response.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod request;
pub mod response;
pub mod state;

pub use agent::{context_entries, AgentSettings, SalesAgent};
pub use request::TaskRequest;
pub use response::AgentResponse;
pub use state::{RequestState, RequestTracker};
