//! End-to-End Pipeline Tests
//!
//! Drives the full engine loop with an in-process handler runner:
//! event intake → trigger resolution → debounced invocation → response
//! dispatch → action scheduling → outbound events.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

use hookwire::config::{ConfigFile, ConfigStore};
use hookwire::core::Orchestrator;
use hookwire::domain::{AnalysisEvent, HandlerOutput, HandlerResponse, OutboundEvent};
use hookwire::runner::{HandlerRunner, InvocationError};
use hookwire::service::NullAnalysisService;

/// Runner that answers each handler id with a canned output document,
/// recording every call. Scripts are raw JSON so malformed documents
/// take the same parse path as real handler stdout.
struct ScriptedRunner {
    scripts: HashMap<String, Value>,
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl ScriptedRunner {
    fn new(scripts: Vec<(&str, Value)>) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .into_iter()
                .map(|(id, script)| (id.to_string(), script))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }

    fn output(handler: &str, response_type: &str, data: Value) -> Value {
        json!({
            "hook_name": handler,
            "event": "test",
            "response_type": response_type,
            "data": data,
        })
    }
}

#[async_trait]
impl HandlerRunner for ScriptedRunner {
    async fn invoke(
        &self,
        handler_id: &str,
        event: &AnalysisEvent,
    ) -> Result<HandlerResponse, InvocationError> {
        self.calls
            .lock()
            .unwrap()
            .push((handler_id.to_string(), event.payload.clone()));

        let Some(script) = self.scripts.get(handler_id) else {
            return Err(InvocationError::UnknownHandler(handler_id.to_string()));
        };

        let output: HandlerOutput =
            serde_json::from_value(script.clone()).map_err(|source| {
                InvocationError::MalformedOutput {
                    handler: handler_id.to_string(),
                    raw: script.to_string(),
                    source,
                }
            })?;

        HandlerResponse::from_output(handler_id, output).map_err(|source| {
            InvocationError::Interpret {
                handler: handler_id.to_string(),
                source,
            }
        })
    }
}

struct Harness {
    events: mpsc::Sender<AnalysisEvent>,
    outbound: mpsc::UnboundedReceiver<OutboundEvent>,
}

impl Harness {
    fn start(yaml: &str, runner: Arc<ScriptedRunner>) -> Self {
        let config = ConfigStore::in_memory(ConfigFile::from_yaml(yaml).unwrap());
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let engine = Orchestrator::new(
            config,
            runner,
            Arc::new(NullAnalysisService),
            outbound_tx,
        );

        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(engine.run(event_rx));

        Self {
            events: event_tx,
            outbound: outbound_rx,
        }
    }

    async fn send(&self, event_type: &str, payload: Value) {
        let payload = payload.as_object().cloned().unwrap_or_default();
        self.events
            .send(AnalysisEvent::new(event_type, payload))
            .await
            .unwrap();
    }

    async fn next_outbound(&mut self) -> OutboundEvent {
        timeout(Duration::from_secs(5), self.outbound.recv())
            .await
            .expect("timed out waiting for outbound event")
            .expect("engine dropped outbound sender")
    }
}

#[tokio::test]
async fn test_diagnostics_event_drives_audio_and_notification() {
    let runner = ScriptedRunner::new(vec![(
        "audio_player",
        ScriptedRunner::output(
            "audio_player",
            "notification",
            json!({"message": "2 errors", "type": "error", "audio": "error.wav", "showUser": true}),
        ),
    )]);
    let mut harness = Harness::start(
        r#"
orchestrator:
  debounce_ms: 0
rules:
  - name: diagnostics-audio
    event: diagnostics_received
    condition: "error_count > 0"
    hooks: [audio_player]
"#,
        Arc::clone(&runner),
    );

    harness
        .send("diagnostics_received", json!({"error_count": 2}))
        .await;

    match harness.next_outbound().await {
        OutboundEvent::PlayAudio { sound, context } => {
            assert_eq!(sound, "error.wav");
            assert_eq!(context.as_deref(), Some("diagnostics_received"));
        }
        other => panic!("expected play_audio, got {other:?}"),
    }
    match harness.next_outbound().await {
        OutboundEvent::UserNotification { title, message, kind, .. } => {
            assert_eq!(title, "audio_player");
            assert_eq!(message, "2 errors");
            assert_eq!(kind, "error");
        }
        other => panic!("expected user_notification, got {other:?}"),
    }

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "audio_player");
    assert_eq!(calls[0].1["error_count"], json!(2));
}

#[tokio::test]
async fn test_action_response_round_trips_through_scheduler() {
    let runner = ScriptedRunner::new(vec![(
        "planner",
        ScriptedRunner::output(
            "planner",
            "action",
            json!([{"type": "notify_user", "priority": 1, "parameters": {"message": "planned"}}]),
        ),
    )]);
    let mut harness = Harness::start(
        r#"
orchestrator:
  debounce_ms: 0
rules:
  - name: plan-on-start
    event: server_started
    hooks: [planner]
"#,
        runner,
    );

    harness.send("server_started", json!({})).await;

    // The action waits in the queue for the next scheduler tick
    match harness.next_outbound().await {
        OutboundEvent::UserNotification { message, .. } => assert_eq!(message, "planned"),
        other => panic!("expected user_notification, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_handler_output_does_not_stall_the_pipeline() {
    let runner = ScriptedRunner::new(vec![
        ("broken", json!("not an output document")),
        (
            "audio_player",
            ScriptedRunner::output(
                "audio_player",
                "notification",
                json!({"message": "still alive", "showUser": true}),
            ),
        ),
    ]);
    let mut harness = Harness::start(
        r#"
orchestrator:
  debounce_ms: 0
rules:
  - name: broken-rule
    event: error_occurred
    hooks: [broken]
  - name: healthy-rule
    event: diagnostics_received
    hooks: [audio_player]
"#,
        Arc::clone(&runner),
    );

    harness.send("error_occurred", json!({})).await;
    harness.send("diagnostics_received", json!({})).await;

    // The broken handler's failure is absorbed; the next event still
    // flows end to end
    match harness.next_outbound().await {
        OutboundEvent::UserNotification { message, .. } => assert_eq!(message, "still alive"),
        other => panic!("expected user_notification, got {other:?}"),
    }
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn test_cascading_triggers_are_depth_bounded() {
    // chain re-triggers itself through a data response; the engine must
    // cut the cycle at max_cascade_depth instead of spinning forever
    let runner = ScriptedRunner::new(vec![(
        "chain",
        ScriptedRunner::output("chain", "data", json!({"triggerHooks": ["chain"]})),
    )]);
    let mut harness = Harness::start(
        r#"
orchestrator:
  debounce_ms: 0
  max_cascade_depth: 3
rules:
  - name: seed
    event: server_started
    hooks: [chain]
  - name: loop
    event: chain
    hooks: [chain]
"#,
        Arc::clone(&runner),
    );

    harness.send("server_started", json!({})).await;

    match harness.next_outbound().await {
        OutboundEvent::UpdateStatus { source, message, kind } => {
            assert_eq!(source, "orchestrator");
            assert_eq!(kind, "error");
            assert!(message.contains("dropped cascade"), "got: {message}");
        }
        other => panic!("expected update_status, got {other:?}"),
    }

    // Depths 0..=3 each invoke once, then the chain is cut
    assert_eq!(runner.calls().len(), 4);
}

#[tokio::test]
async fn test_disabled_engine_drops_events() {
    let runner = ScriptedRunner::new(vec![(
        "audio_player",
        ScriptedRunner::output(
            "audio_player",
            "notification",
            json!({"message": "x", "showUser": true}),
        ),
    )]);
    let mut harness = Harness::start(
        r#"
orchestrator:
  enabled: false
  debounce_ms: 0
rules:
  - name: diagnostics-audio
    event: diagnostics_received
    hooks: [audio_player]
"#,
        Arc::clone(&runner),
    );

    harness.send("diagnostics_received", json!({})).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(runner.calls().is_empty());
    assert!(harness.outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_auto_apply_actions_disabled_drops_actions() {
    let runner = ScriptedRunner::new(vec![(
        "planner",
        ScriptedRunner::output(
            "planner",
            "action",
            json!([{"type": "notify_user", "parameters": {"message": "dropped"}}]),
        ),
    )]);
    let mut harness = Harness::start(
        r#"
orchestrator:
  debounce_ms: 0
  auto_apply_actions: false
rules:
  - name: plan-on-start
    event: server_started
    hooks: [planner]
"#,
        Arc::clone(&runner),
    );

    harness.send("server_started", json!({})).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(runner.calls().len(), 1, "handler still runs");
    assert!(
        harness.outbound.try_recv().is_err(),
        "its actions must never reach the scheduler"
    );
}
