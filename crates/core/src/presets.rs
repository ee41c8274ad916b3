//! Named configuration presets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::PartialConfiguration;
use crate::error::Error;

const MINUTE_MS: u64 = 60 * 1000;

/// Preset for a deployment scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Preset {
    /// Testing/development: short timeline, debug logging
    Development,
    /// Office: normal security
    Office,
    /// Public area: high security
    Public,
    /// Admin accounts: extra security
    Admin,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Development,
        Preset::Office,
        Preset::Public,
        Preset::Admin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Development => "DEVELOPMENT",
            Self::Office => "OFFICE",
            Self::Public => "PUBLIC",
            Self::Admin => "ADMIN",
        }
    }

    /// The fields this preset overrides.
    pub fn partial(&self) -> PartialConfiguration {
        let (inactivity_min, warning_min, debug) = match self {
            Self::Development => (5, 4, true),
            Self::Office => (30, 25, false),
            Self::Public => (10, 8, false),
            Self::Admin => (15, 12, false),
        };

        PartialConfiguration {
            inactivity_timeout_ms: Some(inactivity_min * MINUTE_MS),
            warning_time_ms: Some(warning_min * MINUTE_MS),
            debug_mode: Some(debug),
            show_init_notification: Some(true),
            ..Default::default()
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::unknown_preset(wanted))
    }
}
