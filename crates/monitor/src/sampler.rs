//! Activity sampler.
//!
//! Turns the high-frequency raw event stream into throttled "activity
//! observed" signals for the state machine.

use guard_core::{Configuration, RawEvent, Throttle};
use parking_lot::Mutex;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::bus::EventBus;
use crate::machine::SessionStateMachine;
use crate::store::ConfigStore;

/// What happened to a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Accepted,
    Throttled,
    /// Not in the configured event set
    Ignored,
}

/// Filter and throttle state for one subscription.
#[derive(Debug)]
pub struct Sampler {
    throttle: Throttle,
}

impl Sampler {
    pub fn new(config: &Configuration) -> Self {
        Self {
            throttle: Throttle::new(config.activity_throttle()),
        }
    }

    /// Classifies one raw event against the current configuration.
    pub fn on_event(&mut self, event: &RawEvent, config: &Configuration) -> SampleOutcome {
        if !config.counts_as_activity(event.kind) {
            return SampleOutcome::Ignored;
        }

        self.throttle.set_window(config.activity_throttle());
        if self.throttle.offer(event.at) {
            SampleOutcome::Accepted
        } else {
            SampleOutcome::Throttled
        }
    }
}

/// Live subscription to the event bus.
pub struct ActivitySampler {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ActivitySampler {
    /// Subscribes to `bus` and forwards accepted activity to `machine`.
    pub fn subscribe(
        bus: &EventBus,
        store: Arc<ConfigStore>,
        machine: Arc<SessionStateMachine>,
    ) -> Self {
        let mut rx = bus.subscribe();
        let mut sampler = store.read(Sampler::new);

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        metrics().raw_events.inc();
                        let outcome = store.read(|config| sampler.on_event(&event, config));

                        match outcome {
                            SampleOutcome::Accepted => {
                                metrics().activity_accepted.inc();
                                machine.record_activity(event.at);
                                if machine.debug_mode() {
                                    debug!(event = %event.kind, "Activity detected");
                                }
                            }
                            SampleOutcome::Throttled => {
                                metrics().activity_throttled.inc();
                                trace!(event = %event.kind, "Activity throttled");
                            }
                            SampleOutcome::Ignored => {
                                metrics().activity_ignored.inc();
                            }
                        }

                        if machine.phase().is_terminal() {
                            debug!("Session expired; activity sampler stopping");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Skipped events would have been throttled anyway.
                        warn!(skipped, "Activity sampler lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            task: Mutex::new(Some(task)),
        }
    }

    /// Stops listening. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!("Activity sampler unsubscribed");
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ActivitySampler {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
