//! Tracing setup for structured logging.
//!
//! The filter sits behind a reload layer so the session guard's debug mode
//! can be switched at runtime without reinstalling the subscriber.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Filter used while debug mode is on.
const DEBUG_FILTER: &str = "info,monitor=debug,session_guard=debug";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Base filter (e.g., "info", "monitor=debug")
    pub filter: String,
    pub format: LogFormat,
    pub debug_mode: bool,
    /// The filter came from RUST_LOG and debug mode must not override it.
    pub pinned: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
            debug_mode: false,
            pinned: false,
        }
    }
}

impl TracingConfig {
    /// Reads `RUST_LOG` and `LOG_JSON`.
    pub fn from_env(debug_mode: bool) -> Self {
        let json = std::env::var("LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let rust_log = std::env::var("RUST_LOG").ok();

        Self {
            pinned: rust_log.is_some(),
            filter: rust_log.unwrap_or_else(|| "info".to_string()),
            format: if json { LogFormat::Json } else { LogFormat::Text },
            debug_mode,
        }
    }

    /// The filter directive in force for the given debug mode.
    pub fn directive(&self, debug_mode: bool) -> &str {
        if debug_mode && !self.pinned {
            DEBUG_FILTER
        } else {
            &self.filter
        }
    }
}

/// Handle for changing the log filter after startup.
pub struct LogHandle {
    reload: reload::Handle<EnvFilter, Registry>,
    config: TracingConfig,
    debug_mode: AtomicBool,
}

impl LogHandle {
    pub fn debug_mode(&self) -> bool {
        self.debug_mode.load(Ordering::Relaxed)
    }

    /// Follows the session guard's debug mode. No-op when unchanged.
    pub fn set_debug_mode(&self, debug_mode: bool) {
        if self.debug_mode.swap(debug_mode, Ordering::Relaxed) == debug_mode {
            return;
        }
        let directive = self.config.directive(debug_mode);
        match EnvFilter::try_new(directive) {
            Ok(filter) => {
                if let Err(e) = self.reload.reload(filter) {
                    tracing::warn!(error = %e, "Failed to reload log filter");
                    return;
                }
                tracing::info!(debug_mode, filter = directive, "Log filter updated");
            }
            Err(e) => tracing::warn!(error = %e, filter = directive, "Invalid log filter"),
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init_tracing(config: TracingConfig) -> LogHandle {
    let directive = config.directive(config.debug_mode).to_string();
    let env_filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, reload) = reload::Layer::new(env_filter);

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter_layer)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!("Tracing initialized with filter: {}", directive);
    }

    LogHandle {
        reload,
        debug_mode: AtomicBool::new(config.debug_mode),
        config,
    }
}

/// Initialize tracing from environment variables.
pub fn init_tracing_from_env(debug_mode: bool) -> LogHandle {
    init_tracing(TracingConfig::from_env(debug_mode))
}
