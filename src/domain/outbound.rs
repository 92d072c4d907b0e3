//! Outbound events consumed by UI, audio, and status collaborators.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default display duration for user notifications
pub const DEFAULT_NOTIFICATION_DURATION_MS: u64 = 5_000;

/// Events the engine emits for external collaborators to render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A user-facing notification
    UserNotification {
        title: String,
        message: String,
        #[serde(rename = "type")]
        kind: String,
        duration_ms: u64,
    },

    /// A sound should be played
    PlayAudio {
        sound: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },

    /// The status record changed
    UpdateStatus {
        source: String,
        message: String,
        #[serde(rename = "type")]
        kind: String,
    },

    /// Fresh diagnostics were fetched for a file
    DiagnosticsRefreshed {
        file: String,
        diagnostics: Value,
        count: usize,
    },

    /// A configuration change requires restarting components
    RestartRequired {
        components: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// An action failed during execution
    ActionFailed {
        action: String,
        error: String,
        duration_ms: u64,
    },

    /// The orchestrator configuration was updated and persisted
    ConfigUpdated { keys: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_event_wire_format() {
        let event = OutboundEvent::UserNotification {
            title: "audio_player".to_string(),
            message: "2 errors".to_string(),
            kind: "error".to_string(),
            duration_ms: 5000,
        };

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], json!("user_notification"));
        assert_eq!(wire["type"], json!("error"));
        assert_eq!(wire["message"], json!("2 errors"));
    }

    #[test]
    fn test_action_failed_wire_format() {
        let event = OutboundEvent::ActionFailed {
            action: "refresh_diagnostics".to_string(),
            error: "timed out".to_string(),
            duration_ms: 30_000,
        };

        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["event"], json!("action_failed"));
        assert_eq!(wire["duration_ms"], json!(30_000));
    }
}
