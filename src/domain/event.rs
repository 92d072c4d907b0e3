//! Analysis events consumed by the trigger engine.
//!
//! Events arrive from the external code-analysis service. Cascading
//! events synthesized by the response dispatcher carry the originating
//! handler in `source` and an incremented `cascade_depth`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event types the analysis service is known to emit.
///
/// The engine treats unrecognized types as opaque; they simply match
/// no rules.
pub mod event_types {
    pub const DIAGNOSTICS_RECEIVED: &str = "diagnostics_received";
    pub const SERVER_STARTED: &str = "server_started";
    pub const SERVER_STOPPED: &str = "server_stopped";
    pub const HOVER_RECEIVED: &str = "hover_received";
    pub const ERROR_OCCURRED: &str = "error_occurred";
    pub const ANALYSIS_PERFORMANCE: &str = "analysis_performance";
}

/// A notification from the analysis service (or a cascading synthetic
/// event) describing something that happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisEvent {
    /// Type of event (exact-matched against rules)
    #[serde(alias = "event")]
    pub event_type: String,

    /// Event payload, evaluated by rule conditions
    #[serde(default, alias = "data")]
    pub payload: Map<String, Value>,

    /// When the event occurred
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Originating handler for cascading events (None for external events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// How many cascade hops produced this event (0 = external)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cascade_depth: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl AnalysisEvent {
    /// Create an external event with the current timestamp
    pub fn new(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            timestamp: Utc::now(),
            source: None,
            cascade_depth: 0,
        }
    }

    /// Create a cascading event triggered by a handler's response
    pub fn cascading(event_type: impl Into<String>, source: impl Into<String>, depth: u32) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Map::new(),
            timestamp: Utc::now(),
            source: Some(source.into()),
            cascade_depth: depth,
        }
    }

    /// Look up a payload field by (possibly dotted) path
    pub fn payload_field(&self, path: &str) -> Option<&Value> {
        lookup_field(&self.payload, path)
    }
}

/// Resolve a dotted path like `diagnostics.count` against a payload map
pub fn lookup_field<'a>(payload: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = payload.get(parts.next()?)?;

    for part in parts {
        current = current.as_object()?.get(part)?;
    }

    Some(current)
}
