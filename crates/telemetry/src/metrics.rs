//! Internal metrics collection.
//!
//! Counters live in-process; the host prints a snapshot on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic event count.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements, stopping at zero.
    pub fn dec(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }
}

/// Latency histogram in milliseconds.
///
/// Ticks normally finish in well under a millisecond; `secure_data` may
/// take seconds, so the upper buckets are wide.
#[derive(Debug)]
pub struct Histogram {
    buckets: [AtomicU64; BUCKETS],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

const BUCKETS: usize = 9;

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Inclusive upper bounds; the last bucket also takes everything above.
    const BOUNDS: [u64; BUCKETS] = [1, 5, 25, 100, 250, 1000, 5000, 15000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = Self::BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(BUCKETS - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    /// `(upper bound, count)` per bucket.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BOUNDS
            .iter()
            .zip(&self.buckets)
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the session guard.
#[derive(Debug, Default)]
pub struct Metrics {
    // Sampler metrics
    pub raw_events: Counter,
    pub activity_accepted: Counter,
    pub activity_throttled: Counter,
    pub activity_ignored: Counter,

    // Clock metrics
    pub ticks: Counter,
    pub tick_errors: Counter,

    // Transition metrics
    pub warnings: Counter,
    pub resumes: Counter,
    pub expiries: Counter,
    pub extensions: Counter,
    pub secure_data_errors: Counter,
    pub notify_errors: Counter,

    // Init guard metrics
    pub init_attempts: Counter,
    pub fallback_activations: Counter,

    // Config store metrics
    pub config_updates: Counter,
    pub config_rejections: Counter,

    // Latency histograms
    pub tick_latency_ms: Histogram,
    pub secure_data_latency_ms: Histogram,

    // Gauges
    pub live_sessions: Gauge,
    pub fallback_active: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub raw_events: u64,
    pub activity_accepted: u64,
    pub activity_throttled: u64,
    pub activity_ignored: u64,
    pub ticks: u64,
    pub tick_errors: u64,
    pub warnings: u64,
    pub resumes: u64,
    pub expiries: u64,
    pub extensions: u64,
    pub secure_data_errors: u64,
    pub notify_errors: u64,
    pub init_attempts: u64,
    pub fallback_activations: u64,
    pub config_updates: u64,
    pub config_rejections: u64,
    pub tick_latency_mean_ms: f64,
    pub secure_data_latency_mean_ms: f64,
    pub secure_data_latency_max_ms: u64,
    pub live_sessions: u64,
    pub fallback_active: bool,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            raw_events: self.raw_events.get(),
            activity_accepted: self.activity_accepted.get(),
            activity_throttled: self.activity_throttled.get(),
            activity_ignored: self.activity_ignored.get(),
            ticks: self.ticks.get(),
            tick_errors: self.tick_errors.get(),
            warnings: self.warnings.get(),
            resumes: self.resumes.get(),
            expiries: self.expiries.get(),
            extensions: self.extensions.get(),
            secure_data_errors: self.secure_data_errors.get(),
            notify_errors: self.notify_errors.get(),
            init_attempts: self.init_attempts.get(),
            fallback_activations: self.fallback_activations.get(),
            config_updates: self.config_updates.get(),
            config_rejections: self.config_rejections.get(),
            tick_latency_mean_ms: self.tick_latency_ms.mean(),
            secure_data_latency_mean_ms: self.secure_data_latency_ms.mean(),
            secure_data_latency_max_ms: self.secure_data_latency_ms.max(),
            live_sessions: self.live_sessions.get(),
            fallback_active: self.fallback_active.get() > 0,
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
