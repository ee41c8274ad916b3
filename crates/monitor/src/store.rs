//! Process-wide configuration store.
//!
//! Holds the single source of truth for thresholds, toggles and messages.
//! Every accepted change is pushed synchronously to the attached monitor.

use guard_core::schema::{check_interval_too_coarse, validate_config};
use guard_core::{Configuration, MonitorSettings, PartialConfiguration, Preset, Result};
use parking_lot::{Mutex, RwLock};
use std::sync::Weak;
use telemetry::metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Something that follows monitor settings, usually a live engine.
pub trait SettingsListener: Send + Sync {
    fn apply_settings(&self, settings: MonitorSettings);
}

struct Attached {
    id: Uuid,
    listener: Weak<dyn SettingsListener>,
}

/// Mutable configuration with validated updates.
pub struct ConfigStore {
    current: RwLock<Configuration>,
    attached: RwLock<Option<Attached>>,
    /// Serializes writers so listeners see updates in store order.
    write_lock: Mutex<()>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Creates a store holding the built-in defaults.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Configuration::default()),
            attached: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store from a loaded configuration.
    pub fn with_config(config: Configuration) -> Result<Self> {
        validate_config(&config)?;
        let store = Self::new();
        *store.current.write() = config;
        Ok(store)
    }

    /// Returns a copy of the current configuration.
    pub fn get(&self) -> Configuration {
        self.current.read().clone()
    }

    /// Reads the current configuration without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&Configuration) -> R) -> R {
        f(&self.current.read())
    }

    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings::from(&*self.current.read())
    }

    /// Merges `patch` over the current configuration.
    ///
    /// On a validation failure the previous configuration stays in place.
    pub fn update(&self, patch: &PartialConfiguration) -> Result<()> {
        let _guard = self.write_lock.lock();

        let candidate = self.current.read().merged(patch);
        if let Err(e) = validate_config(&candidate) {
            metrics().config_rejections.inc();
            warn!(error = %e, "Rejected session guard configuration update");
            return Err(e);
        }

        if check_interval_too_coarse(&candidate) {
            warn!(
                check_interval_ms = candidate.check_interval_ms,
                warning_time_ms = candidate.warning_time_ms,
                "Check interval is coarse; warnings may fire late"
            );
        }

        let settings = MonitorSettings::from(&candidate);
        *self.current.write() = candidate;
        metrics().config_updates.inc();
        info!(patch = ?patch, "Session guard configuration updated");

        self.push(settings);
        Ok(())
    }

    /// Applies a named preset.
    pub fn apply_preset(&self, name: &str) -> Result<()> {
        let preset: Preset = name.parse().map_err(|e| {
            warn!(preset = name, "Unknown session guard preset");
            e
        })?;
        self.apply(preset)
    }

    pub fn apply(&self, preset: Preset) -> Result<()> {
        self.update(&preset.partial())?;
        info!(preset = %preset, "Applied session guard preset");
        Ok(())
    }

    /// Restores the built-in defaults.
    pub fn reset(&self) -> Result<()> {
        self.update(&Configuration::default().as_patch())?;
        info!("Session guard configuration reset to defaults");
        Ok(())
    }

    /// Registers the listener that receives settings pushes.
    ///
    /// Replaces any previous listener.
    pub fn attach(&self, id: Uuid, listener: Weak<dyn SettingsListener>) {
        *self.attached.write() = Some(Attached { id, listener });
        debug!(listener = %id, "Settings listener attached");
    }

    /// Removes the listener if it is still the one registered under `id`.
    pub fn detach(&self, id: Uuid) {
        let mut attached = self.attached.write();
        if attached.as_ref().is_some_and(|a| a.id == id) {
            *attached = None;
            debug!(listener = %id, "Settings listener detached");
        }
    }

    pub fn has_listener(&self) -> bool {
        self.attached
            .read()
            .as_ref()
            .is_some_and(|a| a.listener.strong_count() > 0)
    }

    fn push(&self, settings: MonitorSettings) {
        // Upgrade outside the lock so the listener may read the store.
        let listener = self
            .attached
            .read()
            .as_ref()
            .and_then(|a| a.listener.upgrade());

        if let Some(listener) = listener {
            listener.apply_settings(settings);
        }
    }
}
