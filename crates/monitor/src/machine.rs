//! Session state machine.
//!
//! Owns the session phase. Transitions are computed by
//! `guard_core::session` under a short lock; notices and termination run
//! after the lock is released.

use guard_core::{
    millis, Effect, Error, ExpiryReason, ExtensionOutcome, MessageKey, MonitorSettings, Phase,
    SessionState, SessionStatus, Transition,
};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::now;
use crate::ports::{NotificationPort, TerminationPort};
use crate::store::ConfigStore;

pub struct SessionStateMachine {
    state: Mutex<SessionState>,
    settings: RwLock<MonitorSettings>,
    store: Arc<ConfigStore>,
    notifier: Arc<dyn NotificationPort>,
    terminator: Arc<dyn TerminationPort>,
    /// One-shot guard: termination runs at most once per instance.
    terminated: AtomicBool,
}

impl SessionStateMachine {
    pub fn new(
        store: Arc<ConfigStore>,
        notifier: Arc<dyn NotificationPort>,
        terminator: Arc<dyn TerminationPort>,
        started_at: Instant,
    ) -> Self {
        let settings = store.settings();
        Self {
            state: Mutex::new(SessionState::new(started_at)),
            settings: RwLock::new(settings),
            store,
            notifier,
            terminator,
            terminated: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.state.lock().id
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn last_activity_at(&self) -> Instant {
        self.state.lock().last_activity_at
    }

    pub fn settings(&self) -> MonitorSettings {
        *self.settings.read()
    }

    pub fn debug_mode(&self) -> bool {
        self.settings.read().debug_mode
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Adopts new thresholds. They apply from the next evaluation.
    pub fn apply_settings(&self, settings: MonitorSettings) {
        *self.settings.write() = settings;
        if settings.debug_mode {
            debug!(
                session = %self.id(),
                inactivity_timeout_ms = millis(settings.inactivity_timeout),
                warning_time_ms = millis(settings.warning_time),
                check_interval_ms = millis(settings.check_interval),
                "Session monitor reconfigured"
            );
        }
    }

    /// Records accepted activity. Phase changes wait for the next tick.
    pub fn record_activity(&self, at: Instant) {
        self.state.lock().record_activity(at);
    }

    /// Evaluates the session at `now` and runs the resulting effects.
    pub async fn evaluate(&self, now: Instant) -> Transition {
        let thresholds = self.settings.read().thresholds();
        let transition = self.state.lock().advance(now, thresholds);

        if self.debug_mode() {
            debug!(
                phase = %transition.to,
                idle_secs = transition.idle.as_secs(),
                "Session evaluated"
            );
        }

        self.dispatch(transition).await;
        transition
    }

    /// "Continue session" from the warning notice.
    ///
    /// Past the extension limit the request is refused and the session keeps
    /// its phase and idle time.
    pub async fn extend_session(&self, at: Instant) -> ExtensionOutcome {
        let max = self.store.read(|c| c.max_session_extensions);
        let outcome = self.state.lock().extend(at, max);

        match outcome {
            ExtensionOutcome::Granted { remaining } => {
                metrics().extensions.inc();
                info!(session = %self.id(), remaining, "Session extended");
            }
            ExtensionOutcome::LimitReached => {
                warn!(session = %self.id(), "Session extension limit reached; request refused");
            }
            ExtensionOutcome::AlreadyExpired => {}
        }
        outcome
    }

    /// "Log out now" from the warning notice.
    ///
    /// Returns false if the session had already ended.
    pub async fn logout_now(&self) -> bool {
        self.expire(ExpiryReason::Manual).await
    }

    async fn expire(&self, reason: ExpiryReason) -> bool {
        let transition = self.state.lock().expire(now(), reason);
        match transition {
            Some(transition) => {
                self.dispatch(transition).await;
                true
            }
            None => false,
        }
    }

    /// Emits the INIT notice.
    pub fn announce_start(&self) {
        self.notice(MessageKey::Init, Duration::ZERO);
    }

    pub fn status(&self, at: Instant) -> SessionStatus {
        let thresholds = self.settings.read().thresholds();
        let max = self.store.read(|c| c.max_session_extensions);
        self.state.lock().status(at, thresholds, max)
    }

    async fn dispatch(&self, transition: Transition) {
        let Some(effect) = transition.effect else {
            return;
        };

        info!(
            from = %transition.from,
            to = %transition.to,
            idle_secs = transition.idle.as_secs(),
            "Session phase changed"
        );

        match effect {
            Effect::Warn => {
                metrics().warnings.inc();
                self.notice(MessageKey::Warning, transition.idle);
            }
            Effect::Resume => {
                metrics().resumes.inc();
                self.notice(MessageKey::ActivityResume, transition.idle);
            }
            Effect::Expire(reason) => self.terminate(reason, transition.idle).await,
        }
    }

    async fn terminate(&self, reason: ExpiryReason, idle: Duration) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        metrics().expiries.inc();
        warn!(session = %self.id(), reason = %reason, "Session ended; securing data");

        self.notice(MessageKey::Logout, idle);
        self.notice(MessageKey::SecuringData, idle);

        let started = std::time::Instant::now();
        match self.secure_data().await {
            Ok(()) => self.notice(MessageKey::DataSecured, idle),
            Err(e) => {
                metrics().secure_data_errors.inc();
                error!(error = %e, "Failed to secure session data; forcing re-authentication anyway");
            }
        }
        metrics()
            .secure_data_latency_ms
            .observe(millis(started.elapsed()));

        let terminator = &self.terminator;
        if panic::catch_unwind(AssertUnwindSafe(|| terminator.force_reauth())).is_err() {
            error!(session = %self.id(), "Forced re-authentication panicked");
        }
    }

    /// Runs the host's save logic on its own task. A panic there counts as a
    /// failed save.
    async fn secure_data(&self) -> guard_core::Result<()> {
        let terminator = self.terminator.clone();
        match tokio::spawn(async move { terminator.secure_data().await }).await {
            Ok(result) => result,
            Err(e) => Err(Error::termination(e.to_string())),
        }
    }

    fn notice(&self, key: MessageKey, idle: Duration) {
        let settings = *self.settings.read();
        let args = [
            whole_minutes(settings.inactivity_timeout).to_string(),
            whole_minutes(settings.inactivity_timeout.saturating_sub(idle)).to_string(),
        ];

        let rendered = self.store.read(|config| {
            config
                .notice_enabled(key)
                .then(|| config.messages.render(key, &args))
        });

        if let Some(text) = rendered {
            let notifier = &self.notifier;
            if panic::catch_unwind(AssertUnwindSafe(|| notifier.notify(key, &text))).is_err() {
                metrics().notify_errors.inc();
                error!(kind = %key, "Notification handler panicked");
            }
        }
    }
}

/// Minutes, rounded up so "0 minutes left" only shows at expiry.
fn whole_minutes(d: Duration) -> u64 {
    d.as_secs().div_ceil(60)
}
