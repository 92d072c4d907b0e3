//! Domain types for the hookwire engine.
//!
//! This module contains the core data structures:
//! - Events: analysis events in, outbound events out
//! - Responses: the handler wire contract and its typed interpretation
//! - Actions: follow-on effects executed by the scheduler
//! - Invocations: per-handler-run lifecycle records

pub mod action;
pub mod event;
pub mod invocation;
pub mod outbound;
pub mod response;

// Re-export commonly used types
pub use action::{Action, ActionType, DEFAULT_ACTION_PRIORITY};
pub use event::{event_types, AnalysisEvent};
pub use invocation::{HandlerInvocation, InvocationState};
pub use outbound::{OutboundEvent, DEFAULT_NOTIFICATION_DURATION_MS};
pub use response::{
    ConfigPayload, DataPayload, HandlerInput, HandlerOutput, HandlerResponse,
    NotificationPayload, ResponseKind, ResponseParseError,
};
