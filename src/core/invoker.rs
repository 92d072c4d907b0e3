//! Invocation adapter: debounced, isolated handler execution.
//!
//! Bursts of events for the same (handler, event type) pair collapse to
//! one invocation carrying the latest payload (trailing-edge debounce).
//! No two invocations for the same pair run concurrently; a flush that
//! lands while one is in flight is suppressed, not queued.
//!
//! The adapter never blocks the engine loop: dispatched invocations run
//! in spawned tasks and report back over the engine's message channel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{AnalysisEvent, HandlerInvocation, InvocationState};
use crate::runner::HandlerRunner;

use super::engine::EngineMsg;

/// Identifies a debounce/concurrency slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub handler_id: String,
    pub event_type: String,
}

impl DebounceKey {
    pub fn new(handler_id: &str, event_type: &str) -> Self {
        Self {
            handler_id: handler_id.to_string(),
            event_type: event_type.to_string(),
        }
    }
}

/// Debounces and dispatches handler invocations
pub struct InvocationAdapter {
    runner: Arc<dyn HandlerRunner>,
    debounce: Duration,
    tx: mpsc::Sender<EngineMsg>,

    /// Latest event per key awaiting a flush
    pending: HashMap<DebounceKey, AnalysisEvent>,

    /// Keys with a flush timer already armed
    armed: HashSet<DebounceKey>,

    /// Keys with a running invocation
    in_flight: HashSet<DebounceKey>,
}

impl InvocationAdapter {
    /// Create an adapter reporting back over `tx`
    pub fn new(runner: Arc<dyn HandlerRunner>, debounce_ms: u64, tx: mpsc::Sender<EngineMsg>) -> Self {
        Self {
            runner,
            debounce: Duration::from_millis(debounce_ms),
            tx,
            pending: HashMap::new(),
            armed: HashSet::new(),
            in_flight: HashSet::new(),
        }
    }

    /// Apply a changed debounce window (affects future bursts)
    pub fn set_debounce(&mut self, debounce_ms: u64) {
        self.debounce = Duration::from_millis(debounce_ms);
    }

    /// Number of invocations currently running
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Number of events coalescing in debounce windows
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Request an invocation. Within the debounce window only the most
    /// recent event survives; earlier ones are discarded silently.
    pub fn invoke(&mut self, handler_id: &str, event: &AnalysisEvent) {
        let key = DebounceKey::new(handler_id, &event.event_type);
        self.pending.insert(key.clone(), event.clone());

        if self.debounce.is_zero() {
            self.flush(key);
            return;
        }

        if self.armed.insert(key.clone()) {
            let tx = self.tx.clone();
            let delay = self.debounce;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(EngineMsg::Flush(key)).await;
            });
        }
    }

    /// Dispatch the coalesced event for a key, if any.
    ///
    /// Called by the engine loop when a debounce timer fires.
    pub fn flush(&mut self, key: DebounceKey) {
        self.armed.remove(&key);

        let Some(event) = self.pending.remove(&key) else {
            return;
        };

        if self.in_flight.contains(&key) {
            debug!(
                handler = %key.handler_id,
                event = %key.event_type,
                "Invocation still in flight, suppressing"
            );
            return;
        }
        self.in_flight.insert(key.clone());

        let runner = Arc::clone(&self.runner);
        let tx = self.tx.clone();
        let timeout_ms = runner.timeout_ms(&key.handler_id);
        let invocation = HandlerInvocation::started(&key.handler_id, &key.event_type, timeout_ms);

        tokio::spawn(async move {
            let outcome = runner.invoke(&key.handler_id, &event).await.map(|mut response| {
                // The dispatcher keys off the triggering event, not the
                // handler's self-report
                response.event_type = event.event_type.clone();
                // Propagate chain depth so the dispatcher can bound cascades
                response.cascade_depth = event.cascade_depth;
                response
            });
            let state = match &outcome {
                Ok(_) => InvocationState::Completed,
                Err(e) => e.terminal_state(),
            };
            let _ = tx
                .send(EngineMsg::Finished {
                    key,
                    invocation: invocation.finish(state),
                    outcome,
                })
                .await;
        });
    }

    /// Mark a key's invocation as consumed (terminal outcome handled)
    pub fn complete(&mut self, key: &DebounceKey) {
        self.in_flight.remove(key);
    }
}
