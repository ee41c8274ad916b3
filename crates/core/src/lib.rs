//! Core types, presets, and transition rules for the session guard.

pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod presets;
pub mod schema;
pub mod session;
pub mod throttle;

pub use config::*;
pub use error::{ConfigErrorCode, Error, Result};
pub use events::*;
pub use presets::*;
pub use session::*;
pub use throttle::*;
