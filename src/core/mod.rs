//! Core orchestration logic.
//!
//! This module contains:
//! - TriggerEngine: rule matching, throttling, priority resolution
//! - InvocationAdapter: debounced handler dispatch
//! - ResponseDispatcher: response-kind interpretation and side effects
//! - ActionScheduler: bounded priority queue drained on a fixed tick
//! - Orchestrator: the single-writer engine loop tying them together

pub mod condition;
pub mod dispatcher;
pub mod engine;
pub mod history;
pub mod invoker;
pub mod queue;
pub mod scheduler;
pub mod trigger;

// Re-export commonly used types
pub use condition::{CompareOp, Condition, ConditionError};
pub use dispatcher::{DispatchOutcome, ResponseDispatcher, StatusEntry};
pub use engine::{EngineMsg, Orchestrator};
pub use history::{ResponseHistory, DEFAULT_HISTORY_CAPACITY};
pub use invoker::{DebounceKey, InvocationAdapter};
pub use queue::ActionQueue;
pub use scheduler::{ActionScheduler, SCHEDULER_TICK};
pub use trigger::{TriggerEngine, TriggerRule};
