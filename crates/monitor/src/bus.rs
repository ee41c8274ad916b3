//! Process-wide raw event bus.
//!
//! The host publishes every raw interaction here; samplers subscribe to it.
//! Publishing never blocks: slow subscribers lag and skip events.

use guard_core::{EventKind, RawEvent};
use tokio::sync::broadcast;

use crate::clock::now;

/// Default bus capacity (events buffered per subscriber).
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

pub struct EventBus {
    tx: broadcast::Sender<RawEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event stamped with the current time.
    pub fn publish(&self, kind: EventKind) -> usize {
        self.publish_event(RawEvent::new(kind, now()))
    }

    /// Publishes a pre-stamped event. Returns how many subscribers got it.
    pub fn publish_event(&self, event: RawEvent) -> usize {
        // Without subscribers there is nobody to tell.
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RawEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
