//! Test fixtures: configurations and time helpers.

use guard_core::{millis, Configuration, PartialConfiguration};
use std::time::Duration;

pub const SECOND: Duration = Duration::from_secs(1);
pub const MINUTE: Duration = Duration::from_secs(60);

/// Half a second past `d`, so ticks due at `d` have already run.
pub fn just_after(d: Duration) -> Duration {
    d + SECOND / 2
}

/// Built-in defaults: 30 minute timeout, 25 minute warning, 1 minute ticks.
pub fn office_config() -> Configuration {
    Configuration::default()
}

/// Defaults with a custom tick period.
pub fn config_with_check_interval(check_interval: Duration) -> Configuration {
    Configuration {
        check_interval_ms: millis(check_interval),
        ..Default::default()
    }
}

/// A short timeline for tests that only care about ordering.
pub fn short_config() -> Configuration {
    Configuration {
        inactivity_timeout_ms: 10_000,
        warning_time_ms: 6_000,
        check_interval_ms: 1_000,
        activity_throttle_ms: 500,
        ..Default::default()
    }
}

/// Patch that only changes the tick period.
pub fn check_interval_patch(check_interval: Duration) -> PartialConfiguration {
    PartialConfiguration {
        check_interval_ms: Some(millis(check_interval)),
        ..Default::default()
    }
}
