//! Runtime side of the session guard.
//!
//! Wires the pure session model from `guard_core` to tokio: a config store
//! that pushes settings, an event bus, a throttled activity sampler, an idle
//! clock, and the init guard that starts it all.

pub mod bus;
pub mod clock;
pub mod engine;
pub mod guard;
pub mod machine;
pub mod ports;
pub mod registry;
pub mod sampler;
pub mod store;

pub use bus::EventBus;
pub use clock::{now, IdleClock};
pub use engine::Engine;
pub use guard::{AlwaysReady, EngineMode, EnvironmentProbe, InitGuard};
pub use machine::SessionStateMachine;
pub use ports::{LogNotifier, LogTerminator, NotificationPort, TerminationPort};
pub use registry::{registry, EngineRegistry, EngineState, EngineStatus};
pub use sampler::{ActivitySampler, SampleOutcome, Sampler};
pub use store::{ConfigStore, SettingsListener};
