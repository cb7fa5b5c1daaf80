//! Smart Sales Agent Core Library
//!
//! Foundational pieces shared by every crate in the workspace:
//! - Error handling (`AppError`, `AppResult`)
//! - Configuration management
//! - Logging infrastructure
//! - Retry with exponential backoff for external services

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod retry;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use retry::RetryPolicy;
