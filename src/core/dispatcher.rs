//! Response dispatcher: interprets handler responses by kind.
//!
//! Each kind has a fixed interpretation: actions are handed to the
//! scheduler, data responses update the status record and may cascade,
//! notifications drive the UI/audio surfaces, and config responses
//! mutate the orchestrator or the analysis service. Every processed
//! response is appended to the bounded history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ConfigStore;
use crate::domain::{
    Action, AnalysisEvent, HandlerResponse, OutboundEvent, ResponseKind,
    DEFAULT_NOTIFICATION_DURATION_MS,
};
use crate::service::AnalysisService;

use super::history::ResponseHistory;

/// One entry in the process-wide status record (last-write-wins)
#[derive(Debug, Clone)]
pub struct StatusEntry {
    pub value: Value,
    pub source: String,
    pub updated_at: DateTime<Utc>,
}

/// What a dispatch asks the engine to do next
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Actions for the scheduler
    pub actions: Vec<Action>,

    /// Synthetic events re-entering the trigger engine
    pub cascades: Vec<AnalysisEvent>,
}

/// Interprets handler responses and applies their side effects
pub struct ResponseDispatcher {
    history: ResponseHistory,
    status: HashMap<String, StatusEntry>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl ResponseDispatcher {
    /// Create a dispatcher emitting outbound events over `outbound`
    pub fn new(outbound: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self {
            history: ResponseHistory::default(),
            status: HashMap::new(),
            outbound,
        }
    }

    /// The process-wide status record
    pub fn status(&self) -> &HashMap<String, StatusEntry> {
        &self.status
    }

    /// The bounded response history
    pub fn history(&self) -> &ResponseHistory {
        &self.history
    }

    /// Interpret one response. Never fails; problems degrade to logs
    /// and skipped side effects.
    pub async fn dispatch(
        &mut self,
        response: HandlerResponse,
        config: &mut ConfigStore,
        service: &Arc<dyn AnalysisService>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        match &response.kind {
            ResponseKind::Action(actions) => {
                debug!(
                    handler = %response.handler_id,
                    count = actions.len(),
                    "Action response"
                );
                outcome.actions = actions.clone();
            }

            ResponseKind::Data(data) => {
                if let Some(update) = &data.status_update {
                    for (key, value) in update {
                        self.update_status(key, value.clone(), &response.handler_id, "info");
                    }
                }

                let depth = response.cascade_depth;
                let max_depth = config.orchestrator().max_cascade_depth;
                for hook in &data.trigger_hooks {
                    if depth + 1 > max_depth {
                        error!(
                            handler = %response.handler_id,
                            hook = %hook,
                            depth = depth + 1,
                            max = max_depth,
                            "Cascade depth limit exceeded, dropping trigger (check rules for cycles)"
                        );
                        self.update_status(
                            "cascade_limit",
                            Value::String(format!(
                                "dropped cascade {} -> {} at depth {}",
                                response.handler_id,
                                hook,
                                depth + 1
                            )),
                            "orchestrator",
                            "error",
                        );
                        continue;
                    }
                    outcome.cascades.push(AnalysisEvent::cascading(
                        hook.clone(),
                        response.handler_id.clone(),
                        depth + 1,
                    ));
                }
            }

            ResponseKind::Notification(n) => {
                if let Some(sound) = &n.audio {
                    if config.orchestrator().audio_feedback {
                        self.emit(OutboundEvent::PlayAudio {
                            sound: sound.clone(),
                            context: Some(response.event_type.clone()),
                        });
                    }
                }

                if n.affects_status {
                    self.update_status(
                        &response.handler_id,
                        Value::String(n.message.clone()),
                        &response.handler_id,
                        &n.kind,
                    );
                }

                if n.show_user {
                    self.emit(OutboundEvent::UserNotification {
                        title: n.title.clone().unwrap_or_else(|| response.handler_id.clone()),
                        message: n.message.clone(),
                        kind: n.kind.clone(),
                        duration_ms: n.duration_ms.unwrap_or(DEFAULT_NOTIFICATION_DURATION_MS),
                    });
                }
            }

            ResponseKind::Config(c) => {
                if let Some(lsp_config) = &c.lsp_config {
                    // Forwarded unmodified; failure affects only this response
                    if let Err(e) = service.configure(lsp_config.clone()).await {
                        warn!(handler = %response.handler_id, error = %e, "Failed to forward lsp config");
                    }
                }

                if let Some(handler_config) = &c.handler_config {
                    match config.merge_orchestrator(handler_config) {
                        Ok(keys) if !keys.is_empty() => {
                            info!(handler = %response.handler_id, keys = ?keys, "Handler updated orchestrator config");
                            self.emit(OutboundEvent::ConfigUpdated { keys });
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(handler = %response.handler_id, error = %e, "Rejected handler config update");
                        }
                    }
                }

                if c.restart_required {
                    let components = if c.components.is_empty() {
                        vec!["orchestrator".to_string()]
                    } else {
                        c.components.clone()
                    };
                    self.emit(OutboundEvent::RestartRequired {
                        components,
                        reason: Some(format!("requested by {}", response.handler_id)),
                    });
                }
            }
        }

        self.history.push(response);
        outcome
    }

    fn update_status(&mut self, key: &str, value: Value, source: &str, kind: &str) {
        let message = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.status.insert(
            key.to_string(),
            StatusEntry {
                value,
                source: source.to_string(),
                updated_at: Utc::now(),
            },
        );
        self.emit(OutboundEvent::UpdateStatus {
            source: source.to_string(),
            message,
            kind: kind.to_string(),
        });
    }

    fn emit(&self, event: OutboundEvent) {
        if self.outbound.send(event).is_err() {
            debug!("Outbound receiver dropped, discarding event");
        }
    }
}
