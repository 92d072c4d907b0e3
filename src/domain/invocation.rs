//! Per-invocation lifecycle records.
//!
//! One record exists per dispatched (handler, event) pair. It is
//! created when the invocation adapter dispatches and destroyed once
//! the terminal outcome has been consumed by the response dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationState {
    /// Child process running
    Running,

    /// Handler exited and its output parsed
    Completed,

    /// Killed after exceeding its timeout
    TimedOut,

    /// Spawn failure, non-zero exit, or malformed output
    Failed,
}

/// A single handler invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerInvocation {
    /// Unique id for diagnostics
    pub id: Uuid,

    /// Which handler is being invoked
    pub handler_id: String,

    /// Event type that triggered it
    pub event_type: String,

    /// When it was dispatched
    pub started_at: DateTime<Utc>,

    /// Timeout applied to the child process
    pub timeout_ms: u64,

    /// Current lifecycle state
    pub state: InvocationState,
}

impl HandlerInvocation {
    /// Create a running invocation record
    pub fn started(handler_id: &str, event_type: &str, timeout_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            handler_id: handler_id.to_string(),
            event_type: event_type.to_string(),
            started_at: Utc::now(),
            timeout_ms,
            state: InvocationState::Running,
        }
    }

    /// Transition to a terminal state
    pub fn finish(mut self, state: InvocationState) -> Self {
        self.state = state;
        self
    }
}
