//! Process-wide handle to the config store and the live engine.
//!
//! Debug tooling and host code reach the running monitor through
//! `registry()`; components themselves get their store injected.

use guard_core::SessionStatus;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use telemetry::metrics;
use tracing::info;

use crate::bus::EventBus;
use crate::engine::Engine;
use crate::store::ConfigStore;

/// What the registry currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Active,
    /// Initialization gave up; sessions are left to the host's own expiry.
    Fallback,
}

/// Serializable engine status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub init_attempts: u32,
    pub fallback_active: bool,
    pub session: Option<SessionStatus>,
}

pub struct EngineRegistry {
    config: Arc<ConfigStore>,
    bus: Arc<EventBus>,
    engine: RwLock<Option<Arc<Engine>>>,
    state: RwLock<EngineState>,
    init_attempts: AtomicU32,
}

impl EngineRegistry {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self {
            config,
            bus: Arc::new(EventBus::default()),
            engine: RwLock::new(None),
            state: RwLock::new(EngineState::Uninitialized),
            init_attempts: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> Arc<ConfigStore> {
        self.config.clone()
    }

    /// The raw event bus the host publishes interactions to.
    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// The live engine, if one is running and its session has not ended.
    pub fn current(&self) -> Option<Arc<Engine>> {
        self.engine
            .read()
            .as_ref()
            .filter(|engine| !engine.is_shut_down() && !engine.machine().is_terminated())
            .cloned()
    }

    pub fn state(&self) -> EngineState {
        *self.state.read()
    }

    pub fn publish(&self, engine: Arc<Engine>) {
        let previous = self.engine.write().replace(engine);
        if let Some(previous) = previous {
            previous.shutdown();
        }
        *self.state.write() = EngineState::Active;
        metrics().fallback_active.set(0);
    }

    pub fn mark_fallback(&self) {
        *self.state.write() = EngineState::Fallback;
        metrics().fallback_activations.inc();
        metrics().fallback_active.set(1);
    }

    pub fn set_init_attempts(&self, attempts: u32) {
        self.init_attempts.store(attempts, Ordering::Relaxed);
    }

    pub fn status(&self) -> EngineStatus {
        let state = self.state();
        EngineStatus {
            state,
            init_attempts: self.init_attempts.load(Ordering::Relaxed),
            fallback_active: state == EngineState::Fallback,
            // Ended sessions still report, so EXPIRED stays observable.
            session: self.engine.read().as_ref().map(|engine| engine.status()),
        }
    }

    /// Tears down the live engine, if any. Returns true if one was running.
    pub fn shutdown(&self) -> bool {
        let engine = self.engine.write().take();
        *self.state.write() = EngineState::Uninitialized;
        match engine {
            Some(engine) => {
                engine.shutdown();
                info!(session = %engine.id(), "Engine removed from registry");
                true
            }
            None => false,
        }
    }
}

/// Global engine registry.
pub static REGISTRY: std::sync::LazyLock<Arc<EngineRegistry>> =
    std::sync::LazyLock::new(|| Arc::new(EngineRegistry::new(Arc::new(ConfigStore::new()))));

/// Get the global engine registry.
pub fn registry() -> &'static Arc<EngineRegistry> {
    &REGISTRY
}
