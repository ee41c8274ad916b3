//! Configuration validation.

use crate::config::Configuration;
use crate::defaults::MIN_TICKS_PER_WARNING;
use crate::error::{ConfigErrorCode, Error, Result};
use validator::Validate;

/// Validates a candidate configuration.
///
/// Field ranges come from the `validator` derive; threshold ordering is
/// checked by hand.
pub fn validate_config(config: &Configuration) -> Result<()> {
    config
        .validate()
        .map_err(|e| Error::config(ConfigErrorCode::InvalidField, format!("{}", e)))?;

    // Cross-field: the warning must come strictly before expiry
    if config.warning_time_ms >= config.inactivity_timeout_ms {
        return Err(Error::config(
            ConfigErrorCode::ThresholdOrder,
            format!(
                "warning_time_ms ({}) must be below inactivity_timeout_ms ({})",
                config.warning_time_ms, config.inactivity_timeout_ms
            ),
        ));
    }

    Ok(())
}

/// Returns true when the tick period is coarse enough that the warning
/// window may be observed late.
///
/// This is advisory only; such configurations are accepted.
pub fn check_interval_too_coarse(config: &Configuration) -> bool {
    config.check_interval_ms.saturating_mul(MIN_TICKS_PER_WARNING) > config.warning_time_ms
}
