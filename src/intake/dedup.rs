// src/intake/dedup.rs — Bounded set of already-processed event ids
//
// Slack redelivers events it thinks were not acknowledged in time. Each id
// is admitted once; beyond capacity the oldest id is forgotten first.

use std::collections::{HashSet, VecDeque};

/// Reference capacity of the processed-event set.
pub const DEFAULT_MAX_PROCESSED_EVENTS: usize = 1000;

#[derive(Debug)]
pub struct EventDeduplicator {
    seen: HashSet<String>,
    arrival: VecDeque<String>,
    capacity: usize,
}

impl Default for EventDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROCESSED_EVENTS)
    }
}

impl EventDeduplicator {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            seen: HashSet::with_capacity(capacity),
            arrival: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// `true` the first time `event_id` is seen, `false` afterwards
    /// (until the id ages out of the window).
    pub fn admit(&mut self, event_id: &str) -> bool {
        if self.seen.contains(event_id) {
            return false;
        }
        self.seen.insert(event_id.to_string());
        self.arrival.push_back(event_id.to_string());

        while self.arrival.len() > self.capacity {
            if let Some(oldest) = self.arrival.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.seen.contains(event_id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
