//! Bounded circular history of processed handler responses.
//!
//! Kept for diagnostics only; nothing in the pipeline reads back from
//! it. Oldest entries are evicted first.

use std::collections::VecDeque;

use crate::domain::HandlerResponse;

/// Default history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 1_000;

/// Ring buffer of the most recent handler responses
#[derive(Debug)]
pub struct ResponseHistory {
    entries: VecDeque<HandlerResponse>,
    capacity: usize,
}

impl Default for ResponseHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResponseHistory {
    /// Create a history holding at most `capacity` responses
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append a response, evicting the oldest at capacity
    pub fn push(&mut self, response: HandlerResponse) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(response);
    }

    /// Number of retained responses
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent responses, newest last
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &HandlerResponse> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HandlerOutput, HandlerResponse};
    use serde_json::json;

    fn response(n: usize) -> HandlerResponse {
        let output: HandlerOutput = serde_json::from_value(json!({
            "hook_name": format!("hook_{n}"),
            "event": "e",
            "response_type": "data",
            "data": {},
        }))
        .unwrap();
        HandlerResponse::from_output(&format!("hook_{n}"), output).unwrap()
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut history = ResponseHistory::new(3);
        for n in 0..5 {
            history.push(response(n));
        }

        assert_eq!(history.len(), 3);
        let ids: Vec<&str> = history.recent(10).map(|r| r.handler_id.as_str()).collect();
        assert_eq!(ids, vec!["hook_2", "hook_3", "hook_4"]);
    }

    #[test]
    fn test_recent_limits_count() {
        let mut history = ResponseHistory::new(10);
        for n in 0..4 {
            history.push(response(n));
        }

        let ids: Vec<&str> = history.recent(2).map(|r| r.handler_id.as_str()).collect();
        assert_eq!(ids, vec!["hook_2", "hook_3"]);
    }
}
