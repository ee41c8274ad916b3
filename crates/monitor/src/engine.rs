//! A running session monitor: sampler, clock and state machine wired together.

use guard_core::{ExtensionOutcome, MonitorSettings, SessionStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use telemetry::metrics;
use tracing::info;
use uuid::Uuid;

use crate::bus::EventBus;
use crate::clock::{now, IdleClock};
use crate::machine::SessionStateMachine;
use crate::ports::{NotificationPort, TerminationPort};
use crate::sampler::ActivitySampler;
use crate::store::{ConfigStore, SettingsListener};

pub struct Engine {
    id: Uuid,
    store: Arc<ConfigStore>,
    machine: Arc<SessionStateMachine>,
    sampler: ActivitySampler,
    clock: IdleClock,
    shut_down: AtomicBool,
}

impl Engine {
    /// Starts monitoring a fresh session and attaches it to `store`.
    pub fn start(
        store: Arc<ConfigStore>,
        bus: &EventBus,
        notifier: Arc<dyn NotificationPort>,
        terminator: Arc<dyn TerminationPort>,
    ) -> Arc<Self> {
        let machine = Arc::new(SessionStateMachine::new(
            store.clone(),
            notifier,
            terminator,
            now(),
        ));
        let settings = machine.settings();
        let clock = IdleClock::start(machine.clone(), settings.check_interval);
        let sampler = ActivitySampler::subscribe(bus, store.clone(), machine.clone());

        let engine = Arc::new(Self {
            id: machine.id(),
            store: store.clone(),
            machine,
            sampler,
            clock,
            shut_down: AtomicBool::new(false),
        });

        let weak: Weak<Engine> = Arc::downgrade(&engine);
        let listener: Weak<dyn SettingsListener> = weak;
        store.attach(engine.id, listener);
        metrics().live_sessions.inc();

        info!(
            session = %engine.id,
            inactivity_timeout_secs = settings.inactivity_timeout.as_secs(),
            warning_time_secs = settings.warning_time.as_secs(),
            "Activity monitoring started"
        );
        engine
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn machine(&self) -> &Arc<SessionStateMachine> {
        &self.machine
    }

    pub fn status(&self) -> SessionStatus {
        self.machine.status(now())
    }

    pub async fn extend_session(&self) -> ExtensionOutcome {
        self.machine.extend_session(now()).await
    }

    pub async fn logout_now(&self) -> bool {
        self.machine.logout_now().await
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Whether the clock and sampler are both still live.
    pub fn is_running(&self) -> bool {
        !self.is_shut_down() && self.clock.is_running() && self.sampler.is_subscribed()
    }

    /// Stops the clock, then the sampler, then lets go of the store.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.clock.cancel();
        self.sampler.unsubscribe();
        self.store.detach(self.id);
        metrics().live_sessions.dec();
        info!(session = %self.id, "Activity monitoring stopped");
    }
}

impl SettingsListener for Engine {
    fn apply_settings(&self, settings: MonitorSettings) {
        if self.is_shut_down() {
            return;
        }
        self.machine.apply_settings(settings);
        self.clock.reschedule(settings.check_interval);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
