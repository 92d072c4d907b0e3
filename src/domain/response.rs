//! Handler responses and the JSON wire contract.
//!
//! A handler is a standalone executable that reads one JSON document
//! from stdin (`HandlerInput`) and writes one JSON document to stdout
//! (`HandlerOutput`). Outputs are interpreted into a typed
//! `HandlerResponse` whose kind drives the response dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::action::Action;
use super::event::AnalysisEvent;

/// The JSON document written to a handler's stdin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerInput {
    /// Event type
    pub event: String,

    /// Event payload
    pub data: Map<String, Value>,

    /// When the event occurred
    pub timestamp: DateTime<Utc>,

    /// Originating handler for cascading events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl HandlerInput {
    /// Build the stdin document for an event
    pub fn from_event(event: &AnalysisEvent) -> Self {
        Self {
            event: event.event_type.clone(),
            data: event.payload.clone(),
            timestamp: event.timestamp,
            source: event.source.clone(),
        }
    }
}

/// The JSON document a handler writes to stdout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerOutput {
    /// Handler's self-reported name
    pub hook_name: String,

    /// Event type the handler responded to
    pub event: String,

    /// Response kind tag: action, data, notification, config
    pub response_type: String,

    /// Kind-specific payload
    #[serde(default)]
    pub data: Value,

    /// When the handler produced the response
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Whether the handler considers itself successful
    #[serde(default = "default_true")]
    pub success: bool,
}

fn default_true() -> bool {
    true
}

/// Payload of a `notification` response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Notification text
    #[serde(default)]
    pub message: String,

    /// Notification severity/category (info, warning, error, ...)
    #[serde(default = "default_notification_kind", rename = "type")]
    pub kind: String,

    /// Optional title (defaults to the handler id when shown)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Sound to play when audio feedback is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    /// Whether to surface a user-facing notification
    #[serde(default, alias = "showUser")]
    pub show_user: bool,

    /// Whether the status record should be updated
    #[serde(default, alias = "affectsStatus")]
    pub affects_status: bool,

    /// How long a user notification should stay visible
    #[serde(default, alias = "durationMs", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

fn default_notification_kind() -> String {
    "info".to_string()
}

/// Payload of a `data` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataPayload {
    /// Fields merged into the process-wide status record
    #[serde(default, alias = "statusUpdate")]
    pub status_update: Option<Map<String, Value>>,

    /// Handler ids to re-trigger via cascading events
    #[serde(default, alias = "triggerHooks")]
    pub trigger_hooks: Vec<String>,
}

/// Payload of a `config` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigPayload {
    /// Forwarded to the analysis service unmodified
    #[serde(default, alias = "lspConfig")]
    pub lsp_config: Option<Value>,

    /// Merged into the orchestrator configuration and persisted
    #[serde(default, alias = "handlerConfig")]
    pub handler_config: Option<Value>,

    /// Components requiring a restart to pick up the change
    #[serde(default, alias = "restartRequired")]
    pub restart_required: bool,

    /// Which components the restart affects
    #[serde(default)]
    pub components: Vec<String>,
}

/// Typed interpretation of a handler's output, dispatched exhaustively
#[derive(Debug, Clone)]
pub enum ResponseKind {
    /// Structured follow-on actions for the scheduler
    Action(Vec<Action>),

    /// Status updates and cascading triggers
    Data(DataPayload),

    /// User-facing notification with optional audio/status side effects
    Notification(NotificationPayload),

    /// Configuration changes for the engine or the analysis service
    Config(ConfigPayload),
}

impl ResponseKind {
    /// Wire tag for this kind
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Action(_) => "action",
            Self::Data(_) => "data",
            Self::Notification(_) => "notification",
            Self::Config(_) => "config",
        }
    }
}

/// Errors interpreting a handler's output document
#[derive(Debug, thiserror::Error)]
pub enum ResponseParseError {
    #[error("Unknown response type: {0}")]
    UnknownKind(String),

    #[error("Malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A parsed handler response, appended to the bounded history after
/// dispatch
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// Which handler produced it
    pub handler_id: String,

    /// Event type it responded to.
    ///
    /// Initialized from the handler's self-report; the invocation
    /// adapter overwrites it with the triggering event's type so
    /// dispatch never depends on the handler getting this right.
    pub event_type: String,

    /// Typed response payload
    pub kind: ResponseKind,

    /// Handler's self-reported success flag
    pub success: bool,

    /// When the handler produced it
    pub timestamp: DateTime<Utc>,

    /// Cascade depth of the event that triggered the invocation.
    ///
    /// Handlers never see this; the invocation adapter copies it from
    /// the originating event so the dispatcher can bound re-entrancy.
    pub cascade_depth: u32,
}

impl HandlerResponse {
    /// Interpret a wire output document into a typed response.
    ///
    /// Unknown response kinds are an error here; the caller logs and
    /// ignores them rather than failing the pipeline.
    pub fn from_output(handler_id: &str, output: HandlerOutput) -> Result<Self, ResponseParseError> {
        let kind = match output.response_type.as_str() {
            "action" => ResponseKind::Action(Action::normalize_payload(handler_id, output.data)),
            "data" => ResponseKind::Data(parse_payload("data", output.data)?),
            "notification" => {
                ResponseKind::Notification(parse_payload("notification", output.data)?)
            }
            "config" => ResponseKind::Config(parse_payload("config", output.data)?),
            other => return Err(ResponseParseError::UnknownKind(other.to_string())),
        };

        Ok(Self {
            handler_id: handler_id.to_string(),
            event_type: output.event,
            kind,
            success: output.success,
            timestamp: output.timestamp,
            cascade_depth: 0,
        })
    }
}

fn parse_payload<T: Default + serde::de::DeserializeOwned>(
    kind: &'static str,
    data: Value,
) -> Result<T, ResponseParseError> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data).map_err(|source| ResponseParseError::MalformedPayload { kind, source })
}
