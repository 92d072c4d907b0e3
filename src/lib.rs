//! hookwire - Event-driven hook orchestration engine
//!
//! Sits between a code-analysis service (producer of semantic events
//! such as "diagnostics received") and a set of independently
//! executable handler programs (JSON on stdin, JSON on stdout).
//! Decides which handlers run for an event, when (debounced,
//! throttled, priority-ordered), runs them as isolated child processes
//! with timeouts, and interprets their responses into a bounded,
//! priority-ordered queue of follow-on actions.
//!
//! # Architecture
//!
//! Four components composed as a pipeline with one feedback edge:
//! - Trigger Engine: rule table → ordered, deduplicated handler list
//! - Invocation Adapter: debounced subprocess execution with timeouts
//! - Response Dispatcher: response kinds → side effects and cascades
//! - Action Scheduler: priority queue drained one action per tick
//!
//! All in-process state is owned by a single engine task; handler
//! subprocesses are the only true parallelism.
//!
//! # Modules
//!
//! - `core`: orchestration logic (triggers, invoker, dispatcher, scheduler)
//! - `domain`: data structures (events, responses, actions, invocations)
//! - `runner`: handler execution seam and the subprocess runner
//! - `service`: interface to the external analysis service
//! - `config`: YAML configuration loading and persistence
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the engine, reading events as JSONL on stdin
//! hookwire run --config .hookwire/config.yaml
//!
//! # Validate a configuration file
//! hookwire validate --config .hookwire/config.yaml
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod runner;
pub mod service;

// Re-export main types at crate root for convenience
pub use config::{ConfigFile, ConfigStore, HandlerSpec, OrchestratorConfig, RuleSpec};
pub use core::{ActionScheduler, Orchestrator, ResponseDispatcher, TriggerEngine, TriggerRule};
pub use domain::{
    Action, ActionType, AnalysisEvent, HandlerInvocation, HandlerResponse, InvocationState,
    OutboundEvent, ResponseKind,
};
pub use runner::{HandlerRunner, InvocationError, SubprocessRunner};
pub use service::{AnalysisService, NullAnalysisService};
