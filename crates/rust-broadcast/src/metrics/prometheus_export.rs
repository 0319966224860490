//! Prometheus metrics export.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rust_broadcast::metrics::prometheus_export::{PrometheusMetrics, gather_metrics};
//!
//! let registry = prometheus::Registry::new();
//! let metrics = PrometheusMetrics::new(&registry)?;
//! let engine = BroadcastEngine::new(executor).with_prometheus(metrics);
//!
//! // In your HTTP handler for the /metrics endpoint:
//! let body = gather_metrics(&registry);
//! ```

use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

use crate::result::{BroadcastResult, BroadcastState};

/// Prometheus metrics for broadcasts.
#[derive(Debug, Clone)]
pub struct PrometheusMetrics {
    broadcast_total: CounterVec,
    session_results_total: CounterVec,
    session_duration: Histogram,
    active: Gauge,
}

impl PrometheusMetrics {
    /// Create metrics registered with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails, for example when the
    /// registry already holds metrics with the same names.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let broadcast_total = CounterVec::new(
            Opts::new("broadcast_total", "Total broadcasts by outcome"),
            &["status"],
        )?;
        registry.register(Box::new(broadcast_total.clone()))?;

        let session_results_total = CounterVec::new(
            Opts::new(
                "broadcast_session_results_total",
                "Per-session results by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(session_results_total.clone()))?;

        let session_duration = Histogram::with_opts(
            HistogramOpts::new(
                "broadcast_session_duration_seconds",
                "Per-session execution time in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]),
        )?;
        registry.register(Box::new(session_duration.clone()))?;

        let active = Gauge::with_opts(Opts::new(
            "broadcast_active",
            "Number of broadcasts currently running",
        ))?;
        registry.register(Box::new(active.clone()))?;

        Ok(Self {
            broadcast_total,
            session_results_total,
            session_duration,
            active,
        })
    }

    /// Record a broadcast starting.
    pub fn broadcast_started(&self) {
        self.active.inc();
    }

    /// Record a broadcast rejected before running.
    pub fn preflight_failed(&self) {
        self.broadcast_total.with_label_values(&["rejected"]).inc();
    }

    /// Record a finished broadcast.
    pub fn record(&self, result: &BroadcastResult) {
        self.active.dec();
        let status = match result.state {
            BroadcastState::Cancelled => "cancelled",
            BroadcastState::Completed => result.overall_status.as_str(),
        };
        self.broadcast_total.with_label_values(&[status]).inc();

        for r in &result.results {
            self.session_results_total
                .with_label_values(&[r.status.as_str()])
                .inc();
            if !r.is_skipped() {
                self.session_duration
                    .observe(r.execution_time.as_secs_f64());
            }
        }
    }

    /// Get the number of running broadcasts.
    #[must_use]
    pub fn active_broadcasts(&self) -> u64 {
        self.active.get() as u64
    }

    /// Get the count of finished broadcasts with the given status label.
    #[must_use]
    pub fn broadcasts_with_status(&self, status: &str) -> u64 {
        self.broadcast_total.with_label_values(&[status]).get() as u64
    }
}

/// Gather all metrics in a registry in Prometheus text format.
#[must_use]
pub fn gather_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}
