//! Action scheduler: drains the priority queue one action per tick.
//!
//! Execution is strictly serialized: the engine loop awaits each tick,
//! so a slow action delays the next tick rather than overlapping it.
//! Failures are caught at the per-action boundary, logged with elapsed
//! duration, and surfaced via an `action_failed` event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::config::ConfigStore;
use crate::domain::{
    Action, ActionType, OutboundEvent, DEFAULT_NOTIFICATION_DURATION_MS,
};
use crate::service::AnalysisService;

use super::queue::ActionQueue;

/// Recommended scheduler tick
pub const SCHEDULER_TICK: Duration = Duration::from_millis(100);

/// Parameters of a notify_user action
#[derive(Debug, Deserialize)]
struct NotifyParams {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "durationMs")]
    duration_ms: Option<u64>,
}

/// Parameters of a trigger_analysis action
#[derive(Debug, Deserialize)]
struct TriggerAnalysisParams {
    #[serde(default)]
    target_files: Vec<String>,
    #[serde(default = "default_analysis_type")]
    analysis_type: String,
}

fn default_analysis_type() -> String {
    "diagnostics".to_string()
}

/// Owns the action queue and executes dequeued actions
pub struct ActionScheduler {
    queue: ActionQueue,
    service: Arc<dyn AnalysisService>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl ActionScheduler {
    /// Create a scheduler with the given queue capacity
    pub fn new(
        capacity: usize,
        service: Arc<dyn AnalysisService>,
        outbound: mpsc::UnboundedSender<OutboundEvent>,
    ) -> Self {
        Self {
            queue: ActionQueue::new(capacity),
            service,
            outbound,
        }
    }

    /// Number of queued actions
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Queue an action for execution
    pub fn enqueue(&mut self, action: Action) {
        debug!(
            action = action.action_type.as_str(),
            priority = action.priority,
            "Enqueueing action"
        );
        if let Some(evicted) = self.queue.enqueue(action) {
            warn!(
                action = evicted.action_type.as_str(),
                "Action queue full, evicted oldest entry"
            );
        }
    }

    /// Execute at most one action: the head of the queue.
    ///
    /// Each execution is bounded by the configured action timeout; any
    /// failure is reported and the scheduler moves on.
    pub async fn tick(&mut self, config: &mut ConfigStore) {
        self.queue.set_capacity(config.orchestrator().max_queue_size);

        let Some(action) = self.queue.dequeue() else {
            return;
        };

        let label = action.action_type.as_str();
        let budget = Duration::from_millis(config.orchestrator().action_timeout_ms);
        let started = Instant::now();

        let result = timeout(budget, self.execute(action, config)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                debug!(action = label, duration_ms, "Action executed");
            }
            Ok(Err(e)) => {
                error!(action = label, error = %e, duration_ms, "Action failed");
                self.emit(OutboundEvent::ActionFailed {
                    action: label.to_string(),
                    error: format!("{e:#}"),
                    duration_ms,
                });
            }
            Err(_) => {
                error!(action = label, duration_ms, "Action timed out");
                self.emit(OutboundEvent::ActionFailed {
                    action: label.to_string(),
                    error: format!("timed out after {}ms", budget.as_millis()),
                    duration_ms,
                });
            }
        }
    }

    async fn execute(&mut self, action: Action, config: &mut ConfigStore) -> Result<()> {
        match action.action_type {
            ActionType::RefreshDiagnostics => {
                let target = action
                    .target
                    .context("refresh_diagnostics requires a target")?;
                let diagnostics = self.service.fetch_diagnostics(&target).await?;
                let count = diagnostics.len();
                self.emit(OutboundEvent::DiagnosticsRefreshed {
                    file: target,
                    diagnostics: Value::Array(diagnostics),
                    count,
                });
            }

            ActionType::ConfigureServer => {
                self.service.configure(action.parameters).await?;
            }

            ActionType::NotifyUser => {
                let params: NotifyParams = serde_json::from_value(action.parameters)
                    .context("notify_user parameters")?;
                self.emit(OutboundEvent::UserNotification {
                    title: params.title.unwrap_or_else(|| "hookwire".to_string()),
                    message: params.message,
                    kind: params.kind.unwrap_or_else(|| "info".to_string()),
                    duration_ms: params
                        .duration_ms
                        .unwrap_or(DEFAULT_NOTIFICATION_DURATION_MS),
                });
            }

            ActionType::UpdateConfig => {
                let updates = action
                    .parameters
                    .get("config_updates")
                    .and_then(|u| u.get("handlers"));
                match updates {
                    Some(patch) => {
                        let keys = config.merge_orchestrator(patch)?;
                        if keys.is_empty() {
                            debug!("update_config carried no recognized keys");
                        } else {
                            self.emit(OutboundEvent::ConfigUpdated { keys });
                        }
                    }
                    None => {
                        debug!("update_config without config_updates.handlers, nothing to do");
                    }
                }
            }

            ActionType::TriggerAnalysis => {
                let params: TriggerAnalysisParams = serde_json::from_value(action.parameters)
                    .context("trigger_analysis parameters")?;
                if !self.service.supports_analysis(&params.analysis_type) {
                    warn!(
                        kind = %params.analysis_type,
                        "Unsupported analysis type, skipping"
                    );
                    return Ok(());
                }
                for file in &params.target_files {
                    self.service
                        .request_analysis(file, &params.analysis_type)
                        .await?;
                }
            }
        }
        Ok(())
    }

    fn emit(&self, event: OutboundEvent) {
        if self.outbound.send(event).is_err() {
            debug!("Outbound receiver dropped, discarding event");
        }
    }
}
