//! Internal telemetry for the session guard.
//!
//! Structured logging through `tracing`, plus in-process counters that the
//! host can dump as JSON.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
