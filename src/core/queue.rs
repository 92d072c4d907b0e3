//! Bounded priority queue of pending actions.
//!
//! Entries stay sorted by ascending priority, with insertion order
//! breaking ties. At capacity the earliest-enqueued entry is evicted,
//! regardless of its priority: recency is favored over FIFO fairness.

use tracing::debug;

use crate::domain::Action;

#[derive(Debug)]
struct QueuedAction {
    action: Action,
    seq: u64,
}

/// Priority-ordered action queue with a hard capacity
#[derive(Debug)]
pub struct ActionQueue {
    entries: Vec<QueuedAction>,
    capacity: usize,
    next_seq: u64,
}

impl ActionQueue {
    /// Create a queue holding at most `capacity` actions
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    /// Number of queued actions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an action in priority order, evicting the oldest entry
    /// when at capacity. Returns the evicted action, if any.
    pub fn enqueue(&mut self, action: Action) -> Option<Action> {
        let evicted = if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(idx, _)| idx)
                .expect("non-empty queue at capacity");
            let entry = self.entries.remove(oldest);
            debug!(action = entry.action.action_type.as_str(), "Evicted oldest queued action");
            Some(entry.action)
        } else {
            None
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        let pos = self
            .entries
            .partition_point(|entry| entry.action.priority <= action.priority);
        self.entries.insert(pos, QueuedAction { action, seq });

        evicted
    }

    /// Apply a changed capacity, evicting oldest entries while over it
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(idx, _)| idx)
                .expect("entries non-empty while over capacity");
            self.entries.remove(oldest);
        }
    }

    /// Remove and return the head (lowest priority value, then earliest
    /// insertion)
    pub fn dequeue(&mut self) -> Option<Action> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.remove(0).action)
    }

    /// Drop everything (shutdown path)
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
