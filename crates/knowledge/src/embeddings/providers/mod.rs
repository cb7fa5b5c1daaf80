//! Embedding provider implementations.

pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::MockProvider;
pub use ollama::OllamaEmbeddings;
pub use openai::OpenAiEmbeddings;

use sales_core::error::is_transient_status;
use sales_core::AppError;

/// Map a transport failure to an embedding error.
pub(crate) fn send_error(provider: &str, err: reqwest::Error) -> AppError {
    let message = format!("Failed to send request to {}: {}", provider, err);
    if err.is_timeout() || err.is_connect() || err.is_request() {
        AppError::embedding_transient(message)
    } else {
        AppError::embedding(message)
    }
}

/// Map a non-success HTTP status to an embedding error.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    let message = format!("{} embedding error ({}): {}", provider, status, body);
    if is_transient_status(status.as_u16()) {
        AppError::embedding_transient(message)
    } else {
        AppError::embedding(message)
    }
}

pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}
