//! Idle clock: periodic evaluation independent of user input.

use guard_core::millis;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::machine::SessionStateMachine;

/// Current time on the runtime clock.
///
/// Goes through tokio so paused test time applies.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Repeating tick that drives `SessionStateMachine::evaluate`.
pub struct IdleClock {
    period_tx: watch::Sender<Duration>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl IdleClock {
    /// Starts ticking every `check_interval`. The first tick is one full
    /// interval away.
    pub fn start(machine: Arc<SessionStateMachine>, check_interval: Duration) -> Self {
        let (period_tx, period_rx) = watch::channel(check_interval);
        let task = tokio::spawn(run(machine, period_rx));

        Self {
            period_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Changes the tick period.
    ///
    /// The pending tick is cancelled and the next one scheduled a full new
    /// period from now. A tick already running finishes untouched.
    pub fn reschedule(&self, check_interval: Duration) {
        let changed = self.period_tx.send_if_modified(|period| {
            if *period == check_interval {
                false
            } else {
                *period = check_interval;
                true
            }
        });
        if changed {
            debug!(check_interval_ms = millis(check_interval), "Idle clock rescheduled");
        }
    }

    pub fn period(&self) -> Duration {
        *self.period_tx.borrow()
    }

    /// Cancels the pending tick. Safe to call more than once.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!("Idle clock cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IdleClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run(machine: Arc<SessionStateMachine>, mut period_rx: watch::Receiver<Duration>) {
    let mut period = *period_rx.borrow_and_update();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {
                if !tick(&machine).await {
                    info!(session = %machine.id(), "Session expired; idle clock stopped");
                    break;
                }
            }
            changed = period_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                period = *period_rx.borrow_and_update();
            }
        }
    }
}

/// Runs one evaluation. Returns false once the session is over.
async fn tick(machine: &Arc<SessionStateMachine>) -> bool {
    let started = Instant::now();
    metrics().ticks.inc();

    // Run the tick as its own task so a panic inside a collaborator is
    // contained to this tick.
    let m = machine.clone();
    let result = tokio::spawn(async move { m.evaluate(now()).await }).await;

    metrics()
        .tick_latency_ms
        .observe(millis(started.elapsed()));

    match result {
        Ok(transition) => !transition.to.is_terminal(),
        Err(e) => {
            metrics().tick_errors.inc();
            error!(error = %e, "Idle clock tick failed");
            !machine.phase().is_terminal()
        }
    }
}
