//! Lock-free metric primitives and the engine's broadcast metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::result::{BroadcastResult, BroadcastState};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by n.
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// A gauge metric.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement by 1, stopping at zero.
    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            });
    }

    /// Get current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Default histogram buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// A histogram of durations.
#[derive(Debug)]
pub struct Histogram {
    /// Upper bounds in seconds.
    buckets: Vec<f64>,
    /// Counts per bucket, plus one overflow bucket.
    counts: Vec<AtomicU64>,
    /// Sum of observations in microseconds.
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Create with default buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS.to_vec())
    }

    /// Create with custom bucket upper bounds in seconds.
    #[must_use]
    pub fn with_buckets(buckets: Vec<f64>) -> Self {
        let counts = (0..=buckets.len()).map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a duration.
    pub fn observe(&self, value: Duration) {
        let secs = value.as_secs_f64();
        let idx = self
            .buckets
            .iter()
            .position(|&b| secs <= b)
            .unwrap_or(self.buckets.len());
        self.counts[idx].fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(value.as_micros()).unwrap_or(u64::MAX);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get the sum of observations.
    #[must_use]
    pub fn sum(&self) -> Duration {
        Duration::from_micros(self.sum_micros.load(Ordering::Relaxed))
    }

    /// Get the mean observation, or zero before any observation.
    #[must_use]
    pub fn mean(&self) -> Duration {
        let count = self.count();
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.sum_micros.load(Ordering::Relaxed) / count)
        }
    }

    /// Get bucket counts. The last entry counts observations above every
    /// bound.
    #[must_use]
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Timer for measuring durations.
///
/// Reads the tokio clock, so it stands still while time is paused.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop and return the elapsed time.
    #[must_use]
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }

    /// Stop and record to histogram.
    pub fn record_to(self, histogram: &Histogram) {
        histogram.observe(self.stop());
    }
}

/// Metrics recorded by the broadcast engine.
#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    /// Broadcasts that passed target resolution.
    pub broadcasts_started: Counter,
    /// Broadcasts that ran to the end.
    pub broadcasts_completed: Counter,
    /// Broadcasts that observed cancellation.
    pub broadcasts_cancelled: Counter,
    /// Broadcasts rejected before running anything.
    pub preflight_failures: Counter,
    /// Units that were started.
    pub sessions_executed: Counter,
    /// Units that finished with a failed status.
    pub session_failures: Counter,
    /// Units that ran out of time.
    pub session_timeouts: Counter,
    /// Units that were never started.
    pub sessions_skipped: Counter,
    /// Broadcasts currently running.
    pub active_broadcasts: Gauge,
    /// Per-unit execution time.
    pub session_duration: Histogram,
}

impl BroadcastMetrics {
    /// Create new broadcast metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a broadcast that passed target resolution.
    pub fn broadcast_started(&self) {
        self.broadcasts_started.inc();
        self.active_broadcasts.inc();
    }

    /// Record a broadcast rejected before running.
    pub fn preflight_failed(&self) {
        self.preflight_failures.inc();
    }

    /// Record a finished broadcast.
    pub fn broadcast_finished(&self, result: &BroadcastResult) {
        self.active_broadcasts.dec();
        match result.state {
            BroadcastState::Completed => self.broadcasts_completed.inc(),
            BroadcastState::Cancelled => self.broadcasts_cancelled.inc(),
        }
        for r in &result.results {
            if r.is_skipped() {
                self.sessions_skipped.inc();
                continue;
            }
            self.sessions_executed.inc();
            self.session_duration.observe(r.execution_time);
            if r.is_timed_out() {
                self.session_timeouts.inc();
            }
            if !r.is_success() {
                self.session_failures.inc();
            }
        }
    }

    /// Report a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            broadcasts_started: self.broadcasts_started.get(),
            broadcasts_completed: self.broadcasts_completed.get(),
            broadcasts_cancelled: self.broadcasts_cancelled.get(),
            preflight_failures: self.preflight_failures.get(),
            sessions_executed: self.sessions_executed.get(),
            session_failures: self.session_failures.get(),
            session_timeouts: self.session_timeouts.get(),
            sessions_skipped: self.sessions_skipped.get(),
            active_broadcasts: self.active_broadcasts.get(),
            mean_session_duration: self.session_duration.mean(),
        }
    }
}

/// Snapshot of broadcast metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Broadcasts that passed target resolution.
    pub broadcasts_started: u64,
    /// Broadcasts that ran to the end.
    pub broadcasts_completed: u64,
    /// Broadcasts that observed cancellation.
    pub broadcasts_cancelled: u64,
    /// Broadcasts rejected before running anything.
    pub preflight_failures: u64,
    /// Units that were started.
    pub sessions_executed: u64,
    /// Units that finished with a failed status.
    pub session_failures: u64,
    /// Units that ran out of time.
    pub session_timeouts: u64,
    /// Units that were never started.
    pub sessions_skipped: u64,
    /// Broadcasts currently running.
    pub active_broadcasts: u64,
    /// Mean unit execution time.
    pub mean_session_duration: Duration,
}
