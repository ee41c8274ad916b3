//! Bounded-retry initialization with graceful fallback.

use guard_core::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use telemetry::metrics;
use tracing::{error, info, warn};

use crate::engine::Engine;
use crate::ports::{NotificationPort, TerminationPort};
use crate::registry::EngineRegistry;

/// Tells whether the host is ready for session monitoring
/// (a user is signed in, the login screen is gone, ...).
pub trait EnvironmentProbe: Send + Sync {
    fn check(&self) -> Result<()>;
}

impl<F> EnvironmentProbe for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn check(&self) -> Result<()> {
        self()
    }
}

/// Probe for hosts that are ready as soon as they start.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl EnvironmentProbe for AlwaysReady {
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Outcome of initialization.
pub enum EngineMode {
    Active(Arc<Engine>),
    /// The engine is inert; an external expiry mechanism applies.
    Fallback,
}

impl EngineMode {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn engine(&self) -> Option<&Arc<Engine>> {
        match self {
            Self::Active(engine) => Some(engine),
            Self::Fallback => None,
        }
    }
}

pub struct InitGuard {
    registry: Arc<EngineRegistry>,
    probe: Arc<dyn EnvironmentProbe>,
    notifier: Arc<dyn NotificationPort>,
    terminator: Arc<dyn TerminationPort>,
    attempts: AtomicU32,
}

impl InitGuard {
    pub fn new(
        registry: Arc<EngineRegistry>,
        probe: Arc<dyn EnvironmentProbe>,
        notifier: Arc<dyn NotificationPort>,
        terminator: Arc<dyn TerminationPort>,
    ) -> Self {
        Self {
            registry,
            probe,
            notifier,
            terminator,
            attempts: AtomicU32::new(0),
        }
    }

    /// Attempts used since the last success or `force_init`.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Starts the engine, retrying with linear backoff.
    ///
    /// Only fails when every attempt failed and fallback is disabled.
    pub async fn initialize(&self) -> Result<EngineMode> {
        if let Some(engine) = self.registry.current() {
            info!(session = %engine.id(), "Session guard already initialized, skipping");
            return Ok(EngineMode::Active(engine));
        }

        let config = self.registry.config().get();
        let max_attempts = config.max_init_attempts;
        let mut last_error = None;

        while self.attempts() < max_attempts {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.registry.set_init_attempts(attempt);
            metrics().init_attempts.inc();

            match self.try_start() {
                Ok(engine) => {
                    self.attempts.store(0, Ordering::SeqCst);
                    self.registry.publish(engine.clone());
                    engine.machine().announce_start();
                    info!(session = %engine.id(), attempt, "Session guard initialized");
                    return Ok(EngineMode::Active(engine));
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "Session guard init attempt failed");
                    last_error = Some(e);
                    if attempt < max_attempts {
                        tokio::time::sleep(config.init_backoff() * attempt).await;
                    }
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "attempt limit already reached".to_string());

        if config.fallback_enabled {
            error!(
                attempts = max_attempts,
                reason = %reason,
                "Session guard unavailable; falling back to host session handling"
            );
            self.registry.mark_fallback();
            Ok(EngineMode::Fallback)
        } else {
            Err(Error::InitializationFailed {
                attempts: max_attempts,
                reason,
            })
        }
    }

    /// Clears the attempt counter and initializes again.
    pub async fn force_init(&self) -> Result<EngineMode> {
        info!("Force initializing session guard");
        self.attempts.store(0, Ordering::SeqCst);
        self.initialize().await
    }

    fn try_start(&self) -> Result<Arc<Engine>> {
        self.probe.check()?;
        Ok(Engine::start(
            self.registry.config(),
            &self.registry.bus(),
            self.notifier.clone(),
            self.terminator.clone(),
        ))
    }
}
