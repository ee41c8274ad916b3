//! Session phases and the transition rules between them.
//!
//! Everything here is a pure function of `(state, now, thresholds)`. The
//! runtime in the `monitor` crate owns the clock and dispatches effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Session phase. `Expired` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Active,
    Warning,
    Expired,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Warning => "WARNING",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// Idle time reached the inactivity timeout
    Inactivity,
    /// User chose to log out from the warning notice
    Manual,
}

impl fmt::Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactivity => "inactivity",
            Self::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Warning and expiry thresholds, measured as idle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub warning_time: Duration,
    pub inactivity_timeout: Duration,
}

impl Thresholds {
    /// The phase an idle duration falls into, ignoring history.
    pub fn classify(&self, idle: Duration) -> Phase {
        if idle >= self.inactivity_timeout {
            Phase::Expired
        } else if idle >= self.warning_time {
            Phase::Warning
        } else {
            Phase::Active
        }
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Emit the WARNING notice
    Warn,
    /// Emit the ACTIVITY_RESUME notice
    Resume,
    /// Secure data and force re-authentication
    Expire(ExpiryReason),
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Phase,
    pub to: Phase,
    pub idle: Duration,
    pub effect: Option<Effect>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Computes the next phase for a tick at `now`.
///
/// | current | idle band | next | effect |
/// |---|---|---|---|
/// | ACTIVE/WARNING | expired | EXPIRED | expire |
/// | ACTIVE | warning | WARNING | warn |
/// | WARNING | active | ACTIVE | resume |
/// | EXPIRED | any | EXPIRED | none |
///
/// Staying in a phase never repeats its effect.
pub fn evaluate(
    phase: Phase,
    last_activity_at: Instant,
    now: Instant,
    thresholds: Thresholds,
) -> Transition {
    let idle = now.saturating_duration_since(last_activity_at);

    if phase.is_terminal() {
        return Transition {
            from: phase,
            to: phase,
            idle,
            effect: None,
        };
    }

    let (to, effect) = match (phase, thresholds.classify(idle)) {
        (_, Phase::Expired) => (Phase::Expired, Some(Effect::Expire(ExpiryReason::Inactivity))),
        (Phase::Active, Phase::Warning) => (Phase::Warning, Some(Effect::Warn)),
        (Phase::Warning, Phase::Active) => (Phase::Active, Some(Effect::Resume)),
        (current, _) => (current, None),
    };

    Transition {
        from: phase,
        to,
        idle,
        effect,
    }
}

/// Result of a "continue session" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionOutcome {
    Granted { remaining: u32 },
    /// The limit was already used up. Nothing changed.
    LimitReached,
    AlreadyExpired,
}

/// Mutable state of one session instance.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: Uuid,
    pub phase: Phase,
    pub last_activity_at: Instant,
    pub extensions_used: u32,
    pub expiry_reason: Option<ExpiryReason>,
}

impl SessionState {
    pub fn new(now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::Active,
            last_activity_at: now,
            extensions_used: 0,
            expiry_reason: None,
        }
    }

    /// Records accepted activity. Never moves the timestamp backwards and
    /// never changes the phase; the next tick does that. Ignored once the
    /// session has ended.
    pub fn record_activity(&mut self, now: Instant) {
        if !self.phase.is_terminal() && now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity_at)
    }

    /// Evaluates and applies the transition for a tick at `now`.
    pub fn advance(&mut self, now: Instant, thresholds: Thresholds) -> Transition {
        let transition = evaluate(self.phase, self.last_activity_at, now, thresholds);
        self.phase = transition.to;
        if let Some(Effect::Expire(reason)) = transition.effect {
            self.expiry_reason = Some(reason);
        }
        transition
    }

    /// Ends the session outside the tick schedule.
    ///
    /// Returns `None` if it had already ended.
    pub fn expire(&mut self, now: Instant, reason: ExpiryReason) -> Option<Transition> {
        if self.phase.is_terminal() {
            return None;
        }
        let from = self.phase;
        self.phase = Phase::Expired;
        self.expiry_reason = Some(reason);
        Some(Transition {
            from,
            to: Phase::Expired,
            idle: self.idle(now),
            effect: Some(Effect::Expire(reason)),
        })
    }

    /// Counts one explicit extension and records it as activity.
    ///
    /// Past the limit the request is refused and the session is left as is;
    /// only the clock moves the phase.
    pub fn extend(&mut self, now: Instant, max_extensions: u32) -> ExtensionOutcome {
        if self.phase.is_terminal() {
            return ExtensionOutcome::AlreadyExpired;
        }
        if self.extensions_used >= max_extensions {
            return ExtensionOutcome::LimitReached;
        }
        self.extensions_used += 1;
        self.record_activity(now);
        ExtensionOutcome::Granted {
            remaining: max_extensions - self.extensions_used,
        }
    }

    /// Point-in-time view for status reporting.
    pub fn status(&self, now: Instant, thresholds: Thresholds, max_extensions: u32) -> SessionStatus {
        let idle = self.idle(now);
        let since = chrono::Duration::from_std(idle).unwrap_or_else(|_| chrono::Duration::zero());

        SessionStatus {
            session_id: self.id,
            phase: self.phase,
            idle_secs: idle.as_secs(),
            time_until_warning_secs: thresholds.warning_time.saturating_sub(idle).as_secs(),
            time_until_logout_secs: thresholds.inactivity_timeout.saturating_sub(idle).as_secs(),
            last_activity_at: Utc::now() - since,
            extensions_remaining: max_extensions.saturating_sub(self.extensions_used),
            expiry_reason: self.expiry_reason,
        }
    }
}

/// Serializable session status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub phase: Phase,
    pub idle_secs: u64,
    pub time_until_warning_secs: u64,
    pub time_until_logout_secs: u64,
    pub last_activity_at: DateTime<Utc>,
    pub extensions_remaining: u32,
    pub expiry_reason: Option<ExpiryReason>,
}
