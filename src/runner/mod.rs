//! Handler execution.
//!
//! Handlers are duck-typed external executables, but the engine talks
//! to them through the typed `HandlerRunner` seam so tests can swap the
//! subprocess runner for in-process doubles.

pub mod subprocess;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DEFAULT_HANDLER_TIMEOUT_MS;
use crate::domain::{AnalysisEvent, HandlerResponse, InvocationState, ResponseParseError};

// Re-export the production runner
pub use subprocess::SubprocessRunner;

/// Errors invoking a handler.
///
/// All of these are recovered locally: the invocation is recorded as
/// failed or timed out and the pipeline continues.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("No handler registered under id '{0}'")]
    UnknownHandler(String),

    #[error("Failed to encode event for handler '{handler}': {source}")]
    Encode {
        handler: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to spawn handler '{handler}': {source}")]
    Spawn {
        handler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write event to handler '{handler}' stdin: {source}")]
    Stdin {
        handler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to collect output from handler '{handler}': {source}")]
    Wait {
        handler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Handler '{handler}' timed out after {timeout_ms}ms")]
    Timeout { handler: String, timeout_ms: u64 },

    #[error("Handler '{handler}' exited with code {code}: {stderr}")]
    NonZeroExit {
        handler: String,
        code: i32,
        stderr: String,
    },

    #[error("Handler '{handler}' produced malformed output: {source}")]
    MalformedOutput {
        handler: String,
        /// Raw stdout retained for diagnostics
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Handler '{handler}' response not understood: {source}")]
    Interpret {
        handler: String,
        #[source]
        source: ResponseParseError,
    },
}

impl InvocationError {
    /// The terminal invocation state this error corresponds to
    pub fn terminal_state(&self) -> InvocationState {
        match self {
            Self::Timeout { .. } => InvocationState::TimedOut,
            _ => InvocationState::Failed,
        }
    }
}

/// Runs one handler for one event and produces its parsed response
#[async_trait]
pub trait HandlerRunner: Send + Sync {
    /// Invoke the handler, bounded by its configured timeout
    async fn invoke(
        &self,
        handler_id: &str,
        event: &AnalysisEvent,
    ) -> Result<HandlerResponse, InvocationError>;

    /// Effective timeout for a handler (for invocation records)
    fn timeout_ms(&self, _handler_id: &str) -> u64 {
        DEFAULT_HANDLER_TIMEOUT_MS
    }
}
