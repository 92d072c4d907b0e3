//! Debounce Integration Tests
//!
//! Bursts of same-typed events through the full engine loop must
//! coalesce into a single handler invocation carrying the last payload.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use hookwire::config::{ConfigFile, ConfigStore};
use hookwire::core::Orchestrator;
use hookwire::domain::{AnalysisEvent, HandlerOutput, HandlerResponse, OutboundEvent};
use hookwire::runner::{HandlerRunner, InvocationError};
use hookwire::service::NullAnalysisService;

/// Records invocations and answers with a bare data response
struct CountingRunner {
    calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl CountingRunner {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HandlerRunner for CountingRunner {
    async fn invoke(
        &self,
        handler_id: &str,
        event: &AnalysisEvent,
    ) -> Result<HandlerResponse, InvocationError> {
        self.calls
            .lock()
            .unwrap()
            .push((handler_id.to_string(), event.payload.clone()));

        let output: HandlerOutput = serde_json::from_value(json!({
            "hook_name": handler_id,
            "event": event.event_type,
            "response_type": "data",
            "data": {},
        }))
        .map_err(|source| InvocationError::MalformedOutput {
            handler: handler_id.to_string(),
            raw: String::new(),
            source,
        })?;

        HandlerResponse::from_output(handler_id, output).map_err(|source| {
            InvocationError::Interpret {
                handler: handler_id.to_string(),
                source,
            }
        })
    }
}

fn start(
    yaml: &str,
    runner: Arc<CountingRunner>,
) -> (
    mpsc::Sender<AnalysisEvent>,
    mpsc::UnboundedReceiver<OutboundEvent>,
) {
    let config = ConfigStore::in_memory(ConfigFile::from_yaml(yaml).unwrap());
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let engine = Orchestrator::new(config, runner, Arc::new(NullAnalysisService), outbound_tx);

    let (event_tx, event_rx) = mpsc::channel(64);
    tokio::spawn(engine.run(event_rx));
    (event_tx, outbound_rx)
}

async fn send(tx: &mpsc::Sender<AnalysisEvent>, event_type: &str, payload: Value) {
    let payload = payload.as_object().cloned().unwrap_or_default();
    tx.send(AnalysisEvent::new(event_type, payload)).await.unwrap();
}

const BURSTY_CONFIG: &str = r#"
orchestrator:
  debounce_ms: 100
rules:
  - name: lint-on-diagnostics
    event: diagnostics_received
    hooks: [lint]
  - name: greet-on-start
    event: server_started
    hooks: [lint]
"#;

#[tokio::test]
async fn test_burst_coalesces_to_one_invocation_with_last_payload() {
    let runner = CountingRunner::new();
    let (events, _outbound) = start(BURSTY_CONFIG, Arc::clone(&runner));

    for n in 1..=5 {
        send(&events, "diagnostics_received", json!({"n": n})).await;
    }

    tokio::time::sleep(Duration::from_millis(400)).await;

    let calls = runner.calls();
    assert_eq!(calls.len(), 1, "burst must coalesce to one invocation");
    assert_eq!(calls[0].1["n"], json!(5), "last payload wins");
}

#[tokio::test]
async fn test_separate_event_types_debounce_independently() {
    let runner = CountingRunner::new();
    let (events, _outbound) = start(BURSTY_CONFIG, Arc::clone(&runner));

    send(&events, "diagnostics_received", json!({"n": 1})).await;
    send(&events, "server_started", json!({})).await;
    send(&events, "diagnostics_received", json!({"n": 2})).await;

    tokio::time::sleep(Duration::from_millis(400)).await;

    let calls = runner.calls();
    // Same handler, but (handler, event type) keys debounce separately
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().any(|(_, p)| p.get("n") == Some(&json!(2))));
    assert!(calls.iter().any(|(_, p)| p.is_empty()));
}

#[tokio::test]
async fn test_spaced_events_each_invoke() {
    let runner = CountingRunner::new();
    let (events, _outbound) = start(BURSTY_CONFIG, Arc::clone(&runner));

    send(&events, "diagnostics_received", json!({"n": 1})).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    send(&events, "diagnostics_received", json!({"n": 2})).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(runner.calls().len(), 2);
}
