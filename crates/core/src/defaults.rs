//! Built-in defaults for the session guard.
//!
//! These are the values `ConfigStore::reset` restores. Presets override a
//! subset of them; see `presets.rs`.

const MINUTE_MS: u64 = 60 * 1000;

// === Timeline ===

/// Idle time before the session expires (30 minutes).
pub const INACTIVITY_TIMEOUT_MS: u64 = 30 * MINUTE_MS;

/// Idle time before the warning notice (25 minutes).
///
/// Leaves a 5 minute window to react before logout.
pub const WARNING_TIME_MS: u64 = 25 * MINUTE_MS;

/// Idle clock tick period (1 minute).
pub const CHECK_INTERVAL_MS: u64 = MINUTE_MS;

/// Ticks per warning window below which transitions may be observed late.
pub const MIN_TICKS_PER_WARNING: u64 = 4;

// === Sampling ===

/// Minimum spacing between accepted activity signals (1 second).
pub const ACTIVITY_THROTTLE_MS: u64 = 1000;

// === Initialization ===

/// Maximum initialization attempts before giving up.
pub const MAX_INIT_ATTEMPTS: u32 = 10;

/// Base delay between initialization attempts. Grows linearly per attempt.
pub const INIT_BACKOFF_MS: u64 = 1000;

// === Extensions ===

/// How often the user may extend the session from the warning notice.
pub const MAX_SESSION_EXTENSIONS: u32 = 3;
