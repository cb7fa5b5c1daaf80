//! Per-request lifecycle tracking.

use sales_core::AppError;
use sales_prompt::TaskKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Stage of one agent request.
///
/// `Received → Retrieving → Composing → Completing → Done`, with `Failed`
/// reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Retrieving,
    Composing,
    Completing,
    Done,
    Failed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Received => "received",
            RequestState::Retrieving => "retrieving",
            RequestState::Composing => "composing",
            RequestState::Completing => "completing",
            RequestState::Done => "done",
            RequestState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Done | RequestState::Failed)
    }

    /// Whether `next` may follow this state.
    pub fn can_advance_to(&self, next: RequestState) -> bool {
        use RequestState::*;
        match (self, next) {
            (Received, Retrieving)
            | (Retrieving, Composing)
            | (Composing, Completing)
            | (Completing, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logs state transitions of one request.
#[derive(Debug)]
pub struct RequestTracker {
    id: String,
    task: TaskKind,
    state: RequestState,
    started: Instant,
}

impl RequestTracker {
    pub fn new(task: TaskKind) -> Self {
        let tracker = Self {
            id: Uuid::new_v4().to_string(),
            task,
            state: RequestState::Received,
            started: Instant::now(),
        };
        tracing::info!("Request {} ({}) received", tracker.id, task);
        tracker
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn advance(&mut self, next: RequestState) {
        if !self.state.can_advance_to(next) {
            tracing::warn!(
                "Request {}: ignoring transition {} -> {}",
                self.id,
                self.state,
                next
            );
            return;
        }
        tracing::debug!("Request {}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }

    pub fn finish(&mut self) {
        self.advance(RequestState::Done);
        tracing::info!(
            "Request {} ({}) done in {:.2}s",
            self.id,
            self.task,
            self.started.elapsed().as_secs_f64()
        );
    }

    pub fn fail(&mut self, error: &AppError) {
        let stage = self.state;
        self.advance(RequestState::Failed);
        tracing::error!(
            "Request {} ({}) failed while {}: {}",
            self.id,
            self.task,
            stage,
            error
        );
    }
}
