//! Exponential backoff for calls to external services.
//!
//! Only errors reporting `AppError::is_transient()` are retried; everything
//! else is returned on the first failure.

use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Retry settings shared by the embedding and completion clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt, in milliseconds
    pub initial_backoff_ms: u64,

    /// Upper bound for a single delay, in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff to wait after `attempt` failed attempts (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {}ms: {}",
                        label,
                        attempt,
                        max_attempts,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        tracing::error!("{} failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
