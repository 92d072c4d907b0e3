//! Main orchestrator for the hook pipeline.
//!
//! A single task owns all mutable state (rule table, action queue,
//! response history, status record) and drives the pipeline: inbound
//! events are resolved to handlers, handler invocations run in spawned
//! tasks and report back over one message channel, responses are
//! dispatched, and the scheduler tick drains the action queue. Handler
//! subprocesses are the only true parallelism.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::config::ConfigStore;
use crate::domain::{AnalysisEvent, HandlerInvocation, HandlerResponse, OutboundEvent};
use crate::runner::{HandlerRunner, InvocationError};
use crate::service::AnalysisService;

use super::dispatcher::ResponseDispatcher;
use super::invoker::{DebounceKey, InvocationAdapter};
use super::scheduler::{ActionScheduler, SCHEDULER_TICK};
use super::trigger::TriggerEngine;

/// Internal messages from invocation tasks back to the engine loop
#[derive(Debug)]
pub enum EngineMsg {
    /// A debounce window elapsed for a key
    Flush(DebounceKey),

    /// An invocation reached a terminal state
    Finished {
        key: DebounceKey,
        invocation: HandlerInvocation,
        outcome: Result<HandlerResponse, InvocationError>,
    },
}

/// The hook orchestration engine
pub struct Orchestrator {
    config: ConfigStore,
    triggers: TriggerEngine,
    invoker: InvocationAdapter,
    dispatcher: ResponseDispatcher,
    scheduler: ActionScheduler,
    service: Arc<dyn AnalysisService>,
    msg_rx: mpsc::Receiver<EngineMsg>,
}

impl Orchestrator {
    /// Assemble the engine from its collaborators.
    ///
    /// Rules and handler registry come from `config`; outbound events
    /// go to `outbound` for UI/audio/status collaborators to consume.
    pub fn new(
        config: ConfigStore,
        runner: Arc<dyn HandlerRunner>,
        service: Arc<dyn AnalysisService>,
        outbound: mpsc::UnboundedSender<OutboundEvent>,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(256);

        let triggers = TriggerEngine::from_specs(config.rules());
        let invoker =
            InvocationAdapter::new(runner, config.orchestrator().debounce_ms, msg_tx);
        let dispatcher = ResponseDispatcher::new(outbound.clone());
        let scheduler = ActionScheduler::new(
            config.orchestrator().max_queue_size,
            Arc::clone(&service),
            outbound,
        );

        Self {
            config,
            triggers,
            invoker,
            dispatcher,
            scheduler,
            service,
            msg_rx,
        }
    }

    /// Drive the pipeline until the event source closes.
    ///
    /// In-flight invocations are dropped on shutdown; queued actions
    /// are discarded. State does not survive restarts.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut events: mpsc::Receiver<AnalysisEvent>) {
        let mut tick = tokio::time::interval(SCHEDULER_TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            rules = self.triggers.rule_count(),
            "Hook orchestration engine started"
        );

        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                Some(msg) = self.msg_rx.recv() => self.handle_msg(msg).await,
                _ = tick.tick() => {
                    self.scheduler.tick(&mut self.config).await;
                    // Config may have changed via an update_config action
                    self.invoker.set_debounce(self.config.orchestrator().debounce_ms);
                }
            }
        }

        info!("Event source closed, shutting down");
    }

    /// Resolve an event and request invocations for its handlers
    fn handle_event(&mut self, event: AnalysisEvent) {
        if !self.config.orchestrator().enabled {
            debug!(event = %event.event_type, "Engine disabled, dropping event");
            return;
        }

        for handler_id in self.triggers.resolve(&event) {
            self.invoker.invoke(&handler_id, &event);
        }
    }

    async fn handle_msg(&mut self, msg: EngineMsg) {
        match msg {
            EngineMsg::Flush(key) => self.invoker.flush(key),

            EngineMsg::Finished {
                key,
                invocation,
                outcome,
            } => {
                self.invoker.complete(&key);

                match outcome {
                    Ok(response) => {
                        debug!(
                            handler = %invocation.handler_id,
                            kind = response.kind.tag(),
                            "Handler completed"
                        );
                        let outcome = self
                            .dispatcher
                            .dispatch(response, &mut self.config, &self.service)
                            .await;

                        if !outcome.actions.is_empty() {
                            if self.config.orchestrator().auto_apply_actions {
                                for action in outcome.actions {
                                    self.scheduler.enqueue(action);
                                }
                            } else {
                                info!(
                                    handler = %invocation.handler_id,
                                    count = outcome.actions.len(),
                                    "auto_apply_actions disabled, dropping actions"
                                );
                            }
                        }

                        for cascade in outcome.cascades {
                            self.handle_event(cascade);
                        }

                        self.invoker
                            .set_debounce(self.config.orchestrator().debounce_ms);
                    }
                    Err(e) => {
                        // Recovered locally: this handler did not succeed,
                        // the pipeline continues
                        warn!(
                            handler = %invocation.handler_id,
                            event = %invocation.event_type,
                            state = ?invocation.state,
                            error = %e,
                            "Handler invocation failed"
                        );
                    }
                }
            }
        }
    }
}
