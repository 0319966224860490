//! Convenient re-exports for common rust-broadcast usage.
//!
//! ```ignore
//! use rust_broadcast::prelude::*;
//! ```

// Engine
pub use crate::engine::BroadcastEngine;

// Error handling
pub use crate::error::{BroadcastError, ExecutionError, Result};

// Configuration
pub use crate::config::{EngineConfig, LogFormat, LoggingConfig, Settings};

// Sessions and groups
pub use crate::registry::{Group, GroupSpec, GroupUpdate};
pub use crate::types::{
    BroadcastId, ConnectionInfo, GroupId, NewSession, Session, SessionId, SessionStatus,
    SessionType, SessionUpdate,
};

// Filters
pub use crate::filter::{Filter, FilterOperator, FilterType};

// Broadcasting
pub use crate::broadcast::{BroadcastTarget, Strategy};
pub use crate::executor::{ExecutionOutput, SessionExecutor};
pub use crate::result::{
    BroadcastResult, BroadcastState, OverallStatus, ResultStatus, SessionResult, Summary,
};

// Persistence
pub use crate::store::{JsonFileStore, MemoryStore, Store};
