//! rust-broadcast: Command broadcasting engine for groups of sessions
//!
//! This crate sends one command to many registered sessions at once and
//! collects a result per session. Sessions are organised into groups whose
//! membership is computed from filters over tags, names, types and
//! environment variables. The engine never talks to a terminal itself: the
//! actual execution is delegated to a [`SessionExecutor`] you provide.
//!
//! # Features
//!
//! - **Async-first design** with Tokio runtime
//! - **Parallel or sequential** fan-out with per-session timeouts
//! - **Cancellation** of running broadcasts by ID
//! - **Filter-based groups** with a shared regex cache
//! - **Bounded history** and engine statistics
//! - **Pluggable persistence** via [`Store`](store::Store)
//! - **Mock executor** for testing (feature: `mock`)
//! - **Subscriber setup** for applications (feature: `logging`)
//! - **Prometheus export** (feature: `metrics`)
//!
//! # Example
//!
//! ```ignore
//! use rust_broadcast::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = BroadcastEngine::new(MyExecutor::default());
//!     engine.register_session(NewSession::new("web-1", SessionType::Remote).tag("prod"));
//!     engine.register_session(NewSession::new("web-2", SessionType::Remote).tag("prod"));
//!
//!     let prod = engine.create_group(
//!         GroupSpec::new("prod").filter(Filter::tag(FilterOperator::Equals, "prod")),
//!     );
//!     let result = engine.broadcast(BroadcastTarget::group(prod), "uptime").await?;
//!     println!("{}: {}", result.broadcast_id, result.overall_status.as_str());
//!     Ok(())
//! }
//! ```

// Core types
pub mod config;
pub mod error;
pub mod prelude;
pub mod types;

// Core modules
pub mod broadcast;
pub mod engine;
pub mod executor;
pub mod filter;
pub mod registry;
pub mod result;
pub mod util;

// Feature modules
pub mod history;
pub mod metrics;
pub mod stats;
pub mod store;

/// Subscriber initialisation.
#[cfg(feature = "logging")]
pub mod logging;

/// Mock executor for testing.
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use broadcast::{BroadcastTarget, CancellationRegistry, Strategy};
pub use config::{
    ConfigFormat, ConfigLoader, EngineConfig, EnvConfig, LogFormat, LoggingConfig, Settings,
};
pub use engine::BroadcastEngine;
pub use error::{BroadcastError, ExecutionError, Result};
pub use executor::{ExecutionOutput, SessionExecutor};
pub use filter::{Filter, FilterEvaluator, FilterOperator, FilterType, RegexCache};
pub use history::BroadcastHistory;
pub use metrics::{BroadcastMetrics, MetricsSnapshot};
// Conditional re-exports
#[cfg(feature = "mock")]
pub use mock::{MockExecutor, MockResponse};
pub use registry::{Group, GroupRegistry, GroupSpec, GroupUpdate, SessionRegistry};
pub use result::{
    BroadcastResult, BroadcastState, OverallStatus, ResultStatus, SessionResult, Summary,
};
pub use stats::{EngineStats, GroupStats};
pub use store::{JsonFileStore, MemoryStore, Snapshot, Store};
pub use types::{
    BroadcastId, ConnectionInfo, GroupId, NewSession, Session, SessionId, SessionStatus,
    SessionType, SessionUpdate,
};
pub use util::TimeoutExt;
