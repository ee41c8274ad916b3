//! Unified error types for the session guard.
//!
//! Error codes:
//! - CONFIG_001-002: Configuration errors
//! - PRESET_001: Unknown preset
//! - INIT_001: Initialization errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// CONFIG_001: warning time must be strictly below the inactivity timeout
    ThresholdOrder,
    /// CONFIG_002: non-positive duration or out-of-range field
    InvalidField,
}

impl ConfigErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ThresholdOrder => "CONFIG_001",
            Self::InvalidField => "CONFIG_002",
        }
    }
}

/// Unified error type for the session guard.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected configuration update. The previous configuration is kept.
    #[error("[{code}] {message}")]
    Config { code: &'static str, message: String },

    /// PRESET_001
    #[error("[PRESET_001] unknown preset: {0}")]
    UnknownPreset(String),

    /// INIT_001: retries exhausted with fallback disabled.
    #[error("[INIT_001] initialization failed after {attempts} attempts: {reason}")]
    InitializationFailed { attempts: u32, reason: String },

    #[error("environment not ready: {0}")]
    Environment(String),

    #[error("failed to secure session data: {0}")]
    Termination(String),

    #[error("invalid event kind: {0}")]
    InvalidEventKind(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(code: ConfigErrorCode, msg: impl Into<String>) -> Self {
        Self::Config {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn unknown_preset(name: impl Into<String>) -> Self {
        Self::UnknownPreset(name.into())
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment(msg.into())
    }

    pub fn termination(msg: impl Into<String>) -> Self {
        Self::Termination(msg.into())
    }

    /// Whether the host application should treat this as a startup failure.
    ///
    /// Everything else is recovered locally by the component that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InitializationFailed { .. })
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Config { code, .. } => Some(code),
            Self::UnknownPreset(_) => Some("PRESET_001"),
            Self::InitializationFailed { .. } => Some("INIT_001"),
            _ => None,
        }
    }
}
