//! Activity throttling.

use std::time::{Duration, Instant};

/// Whether an event at `now` passes a throttle window that last admitted an
/// event at `last_accepted_at`.
pub fn should_accept(last_accepted_at: Option<Instant>, now: Instant, window: Duration) -> bool {
    match last_accepted_at {
        None => true,
        Some(last) => now.saturating_duration_since(last) >= window,
    }
}

/// Stateful throttle: admits at most one event per window.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_accepted_at: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted_at: None,
        }
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Offers an event. Returns true if it was admitted.
    pub fn offer(&mut self, now: Instant) -> bool {
        if should_accept(self.last_accepted_at, now, self.window) {
            self.last_accepted_at = Some(now);
            true
        } else {
            false
        }
    }
}
