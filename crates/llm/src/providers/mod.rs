//! Completion provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use sales_core::error::is_transient_status;
use sales_core::AppError;

/// Map a transport failure to a completion error.
///
/// Timeouts and connection failures are transient; anything else (bad URL,
/// body encoding) will fail again on retry.
pub(crate) fn send_error(provider: &str, err: reqwest::Error) -> AppError {
    let message = format!("Failed to send request to {}: {}", provider, err);
    if err.is_timeout() || err.is_connect() || err.is_request() {
        AppError::completion_transient(message)
    } else {
        AppError::completion(message)
    }
}

/// Map a non-success HTTP status to a completion error.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    if is_transient_status(status.as_u16()) {
        AppError::completion_transient(message)
    } else {
        AppError::completion(message)
    }
}
