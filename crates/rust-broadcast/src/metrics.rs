//! Metrics collection and reporting.
//!
//! This module provides metrics collection for monitoring broadcast
//! throughput and per-session outcomes. It includes:
//!
//! - Core metrics (counters, gauges, histograms), always available
//! - Prometheus export (with `metrics` feature)
//!
//! # Basic Usage
//!
//! ```rust
//! use rust_broadcast::metrics::{BroadcastMetrics, Counter, Timer};
//!
//! let counter = Counter::new();
//! counter.inc();
//!
//! let metrics = BroadcastMetrics::new();
//! metrics.broadcast_started();
//! assert_eq!(metrics.snapshot().active_broadcasts, 1);
//!
//! let timer = Timer::start();
//! let _elapsed = timer.stop();
//! ```

mod core;

#[cfg(feature = "metrics")]
pub mod prometheus_export;

pub use self::core::*;
