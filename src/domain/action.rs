//! Follow-on actions produced by handler responses.
//!
//! Actions are created when a handler response of kind `action` is
//! dispatched, queued by priority, and executed one at a time by the
//! action scheduler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Default priority when a handler omits one
pub const DEFAULT_ACTION_PRIORITY: i32 = 5;

/// The kinds of follow-on effects the scheduler knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Re-fetch diagnostics for a target file
    RefreshDiagnostics,

    /// Forward a configuration change to the analysis service
    ConfigureServer,

    /// Emit a user-facing notification
    NotifyUser,

    /// Merge updates into the orchestrator configuration
    UpdateConfig,

    /// Re-request analyses for a set of files
    TriggerAnalysis,
}

impl ActionType {
    /// Wire name of this action type (snake_case)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshDiagnostics => "refresh_diagnostics",
            Self::ConfigureServer => "configure_server",
            Self::NotifyUser => "notify_user",
            Self::UpdateConfig => "update_config",
            Self::TriggerAnalysis => "trigger_analysis",
        }
    }
}

/// A structured follow-on effect awaiting execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// What to do
    #[serde(rename = "type")]
    pub action_type: ActionType,

    /// Optional target (e.g. a file for refresh_diagnostics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Free-form parameters interpreted per action type
    #[serde(default)]
    pub parameters: Value,

    /// Execution priority (lower value runs sooner)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    DEFAULT_ACTION_PRIORITY
}

impl Action {
    /// Create an action with default priority and no target
    pub fn new(action_type: ActionType, parameters: Value) -> Self {
        Self {
            action_type,
            target: None,
            parameters,
            priority: DEFAULT_ACTION_PRIORITY,
        }
    }

    /// Set the target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Normalize an action payload (a single object or a list of objects)
    /// into actions. Entries that fail to parse are logged and skipped,
    /// never fatal.
    pub fn normalize_payload(handler_id: &str, payload: Value) -> Vec<Action> {
        let entries = match payload {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };

        let mut actions = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<Action>(entry) {
                Ok(action) => actions.push(action),
                Err(e) => {
                    warn!(handler = handler_id, error = %e, "Skipping malformed action");
                }
            }
        }
        actions
    }
}
