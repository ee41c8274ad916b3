//! Session guard configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use validator::Validate;

use crate::defaults;
use crate::events::EventKind;
use crate::session::Thresholds;

/// Keys of the user-facing message templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKey {
    Init,
    Warning,
    Logout,
    ActivityResume,
    SecuringData,
    DataSecured,
}

impl MessageKey {
    pub const ALL: [MessageKey; 6] = [
        MessageKey::Init,
        MessageKey::Warning,
        MessageKey::Logout,
        MessageKey::ActivityResume,
        MessageKey::SecuringData,
        MessageKey::DataSecured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Warning => "WARNING",
            Self::Logout => "LOGOUT",
            Self::ActivityResume => "ACTIVITY_RESUME",
            Self::SecuringData => "SECURING_DATA",
            Self::DataSecured => "DATA_SECURED",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message templates.
///
/// Templates use positional placeholders: `{0}` is the inactivity timeout in
/// minutes, `{1}` the minutes left before logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub init: String,
    pub warning: String,
    pub logout: String,
    pub activity_resume: String,
    pub securing_data: String,
    pub data_secured: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            init: "Session security active: auto-logout after {0} minutes of inactivity".into(),
            warning: "Warning: your session ends in {1} minutes without activity. \
                      Move the mouse to continue."
                .into(),
            logout: "Session ended: no activity for {0} minutes. Please log in again.".into(),
            activity_resume: "Activity detected. Session resumed.".into(),
            securing_data: "Session ended: no activity for {0} minutes. Securing data...".into(),
            data_secured: "Data secured. Please log in again.".into(),
        }
    }
}

impl Messages {
    pub fn get(&self, key: MessageKey) -> &str {
        match key {
            MessageKey::Init => &self.init,
            MessageKey::Warning => &self.warning,
            MessageKey::Logout => &self.logout,
            MessageKey::ActivityResume => &self.activity_resume,
            MessageKey::SecuringData => &self.securing_data,
            MessageKey::DataSecured => &self.data_secured,
        }
    }

    fn slot(&mut self, key: MessageKey) -> &mut String {
        match key {
            MessageKey::Init => &mut self.init,
            MessageKey::Warning => &mut self.warning,
            MessageKey::Logout => &mut self.logout,
            MessageKey::ActivityResume => &mut self.activity_resume,
            MessageKey::SecuringData => &mut self.securing_data,
            MessageKey::DataSecured => &mut self.data_secured,
        }
    }

    /// Render a template with positional arguments.
    pub fn render(&self, key: MessageKey, args: &[String]) -> String {
        render_template(self.get(key), args)
    }
}

/// Replace `{0}`, `{1}`, ... with the matching argument.
///
/// Placeholders without an argument are left as they are.
pub fn render_template(template: &str, args: &[String]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", i), arg);
    }
    out
}

/// Full session guard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Configuration {
    /// Idle time after which the session expires
    #[validate(range(min = 1))]
    pub inactivity_timeout_ms: u64,
    /// Idle time after which the warning fires
    #[validate(range(min = 1))]
    pub warning_time_ms: u64,
    /// Idle clock tick period
    #[validate(range(min = 1))]
    pub check_interval_ms: u64,
    /// Raw signals that count as activity
    pub activity_events: BTreeSet<EventKind>,
    /// Minimum spacing between accepted activity signals
    pub activity_throttle_ms: u64,
    pub debug_mode: bool,
    pub show_init_notification: bool,
    pub show_warning: bool,
    pub show_activity_resume: bool,
    /// Degrade to an inert engine when initialization keeps failing
    pub fallback_enabled: bool,
    #[validate(range(min = 1))]
    pub max_init_attempts: u32,
    /// Base delay between initialization attempts
    pub init_backoff_ms: u64,
    pub max_session_extensions: u32,
    pub messages: Messages,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: defaults::INACTIVITY_TIMEOUT_MS,
            warning_time_ms: defaults::WARNING_TIME_MS,
            check_interval_ms: defaults::CHECK_INTERVAL_MS,
            activity_events: EventKind::ALL_INPUT.into_iter().collect(),
            activity_throttle_ms: defaults::ACTIVITY_THROTTLE_MS,
            debug_mode: false,
            show_init_notification: true,
            show_warning: true,
            show_activity_resume: true,
            fallback_enabled: true,
            max_init_attempts: defaults::MAX_INIT_ATTEMPTS,
            init_backoff_ms: defaults::INIT_BACKOFF_MS,
            max_session_extensions: defaults::MAX_SESSION_EXTENSIONS,
            messages: Messages::default(),
        }
    }
}

impl Configuration {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    pub fn warning_time(&self) -> Duration {
        Duration::from_millis(self.warning_time_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn activity_throttle(&self) -> Duration {
        Duration::from_millis(self.activity_throttle_ms)
    }

    pub fn init_backoff(&self) -> Duration {
        Duration::from_millis(self.init_backoff_ms)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            warning_time: self.warning_time(),
            inactivity_timeout: self.inactivity_timeout(),
        }
    }

    /// Whether a notice of this kind should reach the notification port.
    ///
    /// LOGOUT, SECURING_DATA and DATA_SECURED are always delivered.
    pub fn notice_enabled(&self, key: MessageKey) -> bool {
        match key {
            MessageKey::Init => self.show_init_notification,
            MessageKey::Warning => self.show_warning,
            MessageKey::ActivityResume => self.show_activity_resume,
            MessageKey::Logout | MessageKey::SecuringData | MessageKey::DataSecured => true,
        }
    }

    /// Whether a raw event of this kind counts as activity.
    pub fn counts_as_activity(&self, kind: EventKind) -> bool {
        if kind.is_visibility() {
            return kind == EventKind::VisibilityShown;
        }
        self.activity_events.contains(&kind)
    }

    /// Returns a copy with every field set in `patch` replaced.
    pub fn merged(&self, patch: &PartialConfiguration) -> Configuration {
        let mut next = self.clone();

        if let Some(v) = patch.inactivity_timeout_ms {
            next.inactivity_timeout_ms = v;
        }
        if let Some(v) = patch.warning_time_ms {
            next.warning_time_ms = v;
        }
        if let Some(v) = patch.check_interval_ms {
            next.check_interval_ms = v;
        }
        if let Some(ref v) = patch.activity_events {
            next.activity_events = v.clone();
        }
        if let Some(v) = patch.activity_throttle_ms {
            next.activity_throttle_ms = v;
        }
        if let Some(v) = patch.debug_mode {
            next.debug_mode = v;
        }
        if let Some(v) = patch.show_init_notification {
            next.show_init_notification = v;
        }
        if let Some(v) = patch.show_warning {
            next.show_warning = v;
        }
        if let Some(v) = patch.show_activity_resume {
            next.show_activity_resume = v;
        }
        if let Some(v) = patch.fallback_enabled {
            next.fallback_enabled = v;
        }
        if let Some(v) = patch.max_init_attempts {
            next.max_init_attempts = v;
        }
        if let Some(v) = patch.init_backoff_ms {
            next.init_backoff_ms = v;
        }
        if let Some(v) = patch.max_session_extensions {
            next.max_session_extensions = v;
        }
        if let Some(ref messages) = patch.messages {
            for (key, template) in messages {
                *next.messages.slot(*key) = template.clone();
            }
        }

        next
    }

    /// Everything in this configuration as a patch. Used by reset.
    pub fn as_patch(&self) -> PartialConfiguration {
        PartialConfiguration {
            inactivity_timeout_ms: Some(self.inactivity_timeout_ms),
            warning_time_ms: Some(self.warning_time_ms),
            check_interval_ms: Some(self.check_interval_ms),
            activity_events: Some(self.activity_events.clone()),
            activity_throttle_ms: Some(self.activity_throttle_ms),
            debug_mode: Some(self.debug_mode),
            show_init_notification: Some(self.show_init_notification),
            show_warning: Some(self.show_warning),
            show_activity_resume: Some(self.show_activity_resume),
            fallback_enabled: Some(self.fallback_enabled),
            max_init_attempts: Some(self.max_init_attempts),
            init_backoff_ms: Some(self.init_backoff_ms),
            max_session_extensions: Some(self.max_session_extensions),
            messages: Some(
                MessageKey::ALL
                    .into_iter()
                    .map(|key| (key, self.messages.get(key).to_string()))
                    .collect(),
            ),
        }
    }
}

/// A partial configuration merged over the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialConfiguration {
    pub inactivity_timeout_ms: Option<u64>,
    pub warning_time_ms: Option<u64>,
    pub check_interval_ms: Option<u64>,
    pub activity_events: Option<BTreeSet<EventKind>>,
    pub activity_throttle_ms: Option<u64>,
    pub debug_mode: Option<bool>,
    pub show_init_notification: Option<bool>,
    pub show_warning: Option<bool>,
    pub show_activity_resume: Option<bool>,
    pub fallback_enabled: Option<bool>,
    pub max_init_attempts: Option<u32>,
    pub init_backoff_ms: Option<u64>,
    pub max_session_extensions: Option<u32>,
    pub messages: Option<BTreeMap<MessageKey, String>>,
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl PartialConfiguration {
    /// Patch that only moves the two thresholds.
    pub fn timeline(inactivity_timeout: Duration, warning_time: Duration) -> Self {
        Self {
            inactivity_timeout_ms: Some(millis(inactivity_timeout)),
            warning_time_ms: Some(millis(warning_time)),
            ..Default::default()
        }
    }
}

/// The subset of the configuration a live monitor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub inactivity_timeout: Duration,
    pub warning_time: Duration,
    pub check_interval: Duration,
    pub debug_mode: bool,
}

impl MonitorSettings {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            warning_time: self.warning_time,
            inactivity_timeout: self.inactivity_timeout,
        }
    }
}

impl From<&Configuration> for MonitorSettings {
    fn from(config: &Configuration) -> Self {
        Self {
            inactivity_timeout: config.inactivity_timeout(),
            warning_time: config.warning_time(),
            check_interval: config.check_interval(),
            debug_mode: config.debug_mode,
        }
    }
}
