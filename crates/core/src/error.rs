//! Error types for the Smart Sales Agent.
//!
//! This module defines a unified error enum that covers every failure the
//! pipeline can surface: bad caller input, external embedding/completion
//! service failures, vector store outages, request timeouts and the usual
//! configuration, I/O and serialization errors.

use thiserror::Error;

/// Unified error type for the Smart Sales Agent.
///
/// All library functions return `Result<T, AppError>`.
/// Lower layers never swallow errors; the orchestrator decides what to surface.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad caller input (never retried)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Embedding service failures
    #[error("Embedding service error: {message}")]
    EmbeddingService { message: String, transient: bool },

    /// Completion (LLM) service failures
    #[error("Completion service error: {message}")]
    CompletionService { message: String, transient: bool },

    /// Vector store cannot be reached
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// Request-level deadline exceeded
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset ingestion errors
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Permanent embedding service failure.
    pub fn embedding(message: impl Into<String>) -> Self {
        AppError::EmbeddingService {
            message: message.into(),
            transient: false,
        }
    }

    /// Embedding service failure that may succeed on retry.
    pub fn embedding_transient(message: impl Into<String>) -> Self {
        AppError::EmbeddingService {
            message: message.into(),
            transient: true,
        }
    }

    /// Permanent completion service failure.
    pub fn completion(message: impl Into<String>) -> Self {
        AppError::CompletionService {
            message: message.into(),
            transient: false,
        }
    }

    /// Completion service failure that may succeed on retry.
    pub fn completion_transient(message: impl Into<String>) -> Self {
        AppError::CompletionService {
            message: message.into(),
            transient: true,
        }
    }

    /// Whether retrying the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::EmbeddingService { transient, .. }
            | AppError::CompletionService { transient, .. } => *transient,
            _ => false,
        }
    }

    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::EmbeddingService { .. } | AppError::CompletionService { .. } => 502,
            AppError::IndexUnavailable(_) => 503,
            AppError::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Short machine-readable category name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::EmbeddingService { .. } => "embedding_service",
            AppError::CompletionService { .. } => "completion_service",
            AppError::IndexUnavailable(_) => "index_unavailable",
            AppError::Timeout(_) => "timeout",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Ingest(_) => "ingest",
            AppError::Prompt(_) => "prompt",
            AppError::Serialization(_) => "serialization",
            AppError::Other(_) => "other",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Ingest(err.to_string())
    }
}

/// Whether an HTTP status from an external service is worth retrying.
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
