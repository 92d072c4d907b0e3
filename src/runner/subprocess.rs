//! Subprocess handler runner.
//!
//! Each invocation spawns the handler's executable, writes the event as
//! one JSON document to stdin, closes stdin to signal end-of-input, and
//! collects stdout until the process exits or its timeout elapses. On
//! timeout the child is killed.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::config::HandlerSpec;
use crate::domain::{AnalysisEvent, HandlerInput, HandlerOutput, HandlerResponse};

use super::{HandlerRunner, InvocationError};

/// Runs handlers as isolated child processes
pub struct SubprocessRunner {
    handlers: BTreeMap<String, HandlerSpec>,
}

impl SubprocessRunner {
    /// Create a runner over the configured handler registry
    pub fn new(handlers: BTreeMap<String, HandlerSpec>) -> Self {
        Self { handlers }
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn spec(&self, handler_id: &str) -> Result<&HandlerSpec, InvocationError> {
        self.handlers
            .get(handler_id)
            .ok_or_else(|| InvocationError::UnknownHandler(handler_id.to_string()))
    }

    async fn run_child(
        &self,
        handler_id: &str,
        spec: &HandlerSpec,
        input: &HandlerInput,
    ) -> Result<Vec<u8>, InvocationError> {
        let mut child = Command::new(&spec.command)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                handler: handler_id.to_string(),
                source,
            })?;

        let document = serde_json::to_vec(input).map_err(|source| InvocationError::Encode {
            handler: handler_id.to_string(),
            source,
        })?;
        if let Some(mut stdin) = child.stdin.take() {
            // A handler that exits without reading stdin closes the pipe;
            // that is not an invocation failure
            if let Err(source) = stdin.write_all(&document).await {
                if source.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(InvocationError::Stdin {
                        handler: handler_id.to_string(),
                        source,
                    });
                }
            }
            // Drop stdin to signal end-of-input
        }

        let timeout_ms = spec.timeout_ms();
        let output = timeout(Duration::from_millis(timeout_ms), child.wait_with_output())
            .await
            .map_err(|_| InvocationError::Timeout {
                handler: handler_id.to_string(),
                timeout_ms,
            })?
            .map_err(|source| InvocationError::Wait {
                handler: handler_id.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(InvocationError::NonZeroExit {
                handler: handler_id.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl HandlerRunner for SubprocessRunner {
    async fn invoke(
        &self,
        handler_id: &str,
        event: &AnalysisEvent,
    ) -> Result<HandlerResponse, InvocationError> {
        let spec = self.spec(handler_id)?;
        let input = HandlerInput::from_event(event);

        debug!(handler = handler_id, event = %event.event_type, command = %spec.command, "Spawning handler");
        let stdout = self.run_child(handler_id, spec, &input).await?;

        let output: HandlerOutput =
            serde_json::from_slice(&stdout).map_err(|source| InvocationError::MalformedOutput {
                handler: handler_id.to_string(),
                raw: String::from_utf8_lossy(&stdout).to_string(),
                source,
            })?;

        HandlerResponse::from_output(handler_id, output).map_err(|source| {
            InvocationError::Interpret {
                handler: handler_id.to_string(),
                source,
            }
        })
    }

    fn timeout_ms(&self, handler_id: &str) -> u64 {
        self.handlers
            .get(handler_id)
            .map(|spec| spec.timeout_ms())
            .unwrap_or(crate::config::DEFAULT_HANDLER_TIMEOUT_MS)
    }
}
