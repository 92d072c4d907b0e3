//! Trigger engine: maps an analysis event to the ordered list of
//! handlers that should run.
//!
//! Resolution filters the rule table by event type and condition,
//! applies per-rule throttling, orders survivors by priority (ties by
//! registration order), and deduplicates handler ids keeping first
//! occurrence.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::RuleSpec;
use crate::domain::AnalysisEvent;

use super::condition::Condition;

/// A registered condition→handlers rule
#[derive(Debug, Clone)]
pub struct TriggerRule {
    /// Rule name (unique within the table)
    pub name: String,

    /// Event type this rule matches exactly
    pub event_type: String,

    /// Condition over the event payload
    pub condition: Condition,

    /// Suppress repeat firings within this window (0 = no throttle)
    pub throttle_ms: u64,

    /// Lower values fire their handlers sooner
    pub priority: i32,

    /// Handlers to invoke, in order
    pub handlers: Vec<String>,

    /// Whether the rule participates in resolution
    pub enabled: bool,
}

impl TriggerRule {
    /// Build a rule from its config representation.
    ///
    /// A malformed condition expression disables matching for the rule
    /// (logged, never fatal), per the rule-evaluation error policy.
    pub fn from_spec(spec: &RuleSpec) -> Self {
        let condition = match Condition::parse(&spec.condition) {
            Ok(condition) => condition,
            Err(e) => {
                warn!(rule = %spec.name, error = %e, "Malformed rule condition, rule will never match");
                Condition::Never
            }
        };

        Self {
            name: spec.name.clone(),
            event_type: spec.event.clone(),
            condition,
            throttle_ms: spec.throttle_ms,
            priority: spec.priority,
            handlers: spec.hooks.clone(),
            enabled: spec.enabled,
        }
    }
}

/// Holds the mutable rule table and per-rule throttle state
#[derive(Debug, Default)]
pub struct TriggerEngine {
    /// Rules in registration order (order breaks priority ties)
    rules: Vec<TriggerRule>,

    /// Last non-throttled firing per rule name
    last_fired: HashMap<String, Instant>,
}

impl TriggerEngine {
    /// Create an engine with the given rules
    pub fn new(rules: Vec<TriggerRule>) -> Self {
        Self {
            rules,
            last_fired: HashMap::new(),
        }
    }

    /// Create an engine from config rule specs
    pub fn from_specs(specs: &[RuleSpec]) -> Self {
        Self::new(specs.iter().map(TriggerRule::from_spec).collect())
    }

    /// Number of registered rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// The registered rules
    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Enable or disable a rule by name; false if no such rule
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Change a rule's priority; false if no such rule
    pub fn set_priority(&mut self, name: &str, priority: i32) -> bool {
        match self.rules.iter_mut().find(|r| r.name == name) {
            Some(rule) => {
                rule.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Replace the whole rule table (explicit reconfiguration)
    pub fn replace_rules(&mut self, rules: Vec<TriggerRule>) {
        self.last_fired
            .retain(|name, _| rules.iter().any(|r| &r.name == name));
        self.rules = rules;
    }

    /// Resolve the ordered, deduplicated handler list for an event.
    ///
    /// Updates throttle state for every rule that fires. Condition
    /// evaluation failures are logged and treated as non-matching.
    pub fn resolve(&mut self, event: &AnalysisEvent) -> Vec<String> {
        let now = Instant::now();
        let mut matched: Vec<&TriggerRule> = Vec::new();

        for rule in &self.rules {
            if !rule.enabled || rule.event_type != event.event_type {
                continue;
            }

            match rule.condition.evaluate(&event.payload) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!(rule = %rule.name, error = %e, "Condition evaluation failed, treating as non-match");
                    continue;
                }
            }

            if rule.throttle_ms > 0 {
                if let Some(last) = self.last_fired.get(&rule.name) {
                    if now.duration_since(*last).as_millis() < u128::from(rule.throttle_ms) {
                        debug!(rule = %rule.name, "Rule throttled");
                        continue;
                    }
                }
            }

            matched.push(rule);
        }

        // Stable sort keeps registration order among equal priorities
        matched.sort_by_key(|rule| rule.priority);

        let mut seen = HashSet::new();
        let mut handlers = Vec::new();
        let mut fired = Vec::new();

        for rule in matched {
            fired.push(rule.name.clone());
            for handler in &rule.handlers {
                if seen.insert(handler.clone()) {
                    handlers.push(handler.clone());
                }
            }
        }

        for name in fired {
            self.last_fired.insert(name, now);
        }

        if !handlers.is_empty() {
            debug!(event = %event.event_type, handlers = ?handlers, "Resolved handlers");
        }
        handlers
    }
}
