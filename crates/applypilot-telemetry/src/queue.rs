//! The bounded event queue.
//!
//! Holds at most `cap` events. Pushing past the cap drops the oldest event
//! and counts it, so a long outage costs old telemetry rather than memory.

use std::collections::VecDeque;

use applypilot_contracts::telemetry::ObservabilityEvent;

#[derive(Debug, Clone)]
pub struct EventQueue {
    events: VecDeque<ObservabilityEvent>,
    cap: usize,
    dropped: u64,
}

impl EventQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(cap),
            cap,
            dropped: 0,
        }
    }

    /// Append `event`. Returns how many old events were dropped to make room.
    pub fn push(&mut self, event: ObservabilityEvent) -> usize {
        self.events.push_back(event);
        self.enforce_cap()
    }

    /// Remove up to `n` events from the front.
    pub fn take_batch(&mut self, n: usize) -> Vec<ObservabilityEvent> {
        let n = n.min(self.events.len());
        self.events.drain(..n).collect()
    }

    /// Put a failed batch back in front of newer events, in original order.
    ///
    /// Returns how many events were dropped re-applying the cap.
    pub fn requeue_front(&mut self, batch: Vec<ObservabilityEvent>) -> usize {
        for event in batch.into_iter().rev() {
            self.events.push_front(event);
        }
        self.enforce_cap()
    }

    /// Remove and return everything.
    pub fn drain_all(&mut self) -> Vec<ObservabilityEvent> {
        self.events.drain(..).collect()
    }

    /// Replace the contents, keeping the newest `cap` events.
    pub fn restore(&mut self, events: Vec<ObservabilityEvent>) -> usize {
        self.events = events.into();
        self.enforce_cap()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events dropped to overflow since the queue was created.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObservabilityEvent> {
        self.events.iter()
    }

    fn enforce_cap(&mut self) -> usize {
        let excess = self.events.len().saturating_sub(self.cap);
        if excess > 0 {
            self.events.drain(..excess);
            self.dropped += excess as u64;
        }
        excess
    }
}
