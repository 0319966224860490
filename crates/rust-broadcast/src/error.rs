//! Error types for rust-broadcast.
//!
//! Only pre-flight failures (an unknown group, or a target with no active
//! sessions) are raised to broadcast callers. Failures local to one session
//! are folded into that session's [`SessionResult`](crate::result::SessionResult)
//! and never abort a broadcast.

use std::time::Duration;

use thiserror::Error;

use crate::types::{GroupId, SessionId};

/// The main error type for rust-broadcast operations.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The broadcast target group does not exist.
    #[error("group {id} not found")]
    UnknownGroup {
        /// The group ID that was not found.
        id: GroupId,
    },

    /// The resolved target has no session with `active` status.
    #[error("no active sessions in {target}; nothing was executed")]
    NoActiveSessions {
        /// Description of the target that was resolved.
        target: String,
    },

    /// A session-scoped operation referenced an unknown session.
    #[error("session {id} not found")]
    UnknownSession {
        /// The session ID that was not found.
        id: SessionId,
    },

    /// A filter type or operator could not be parsed.
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// Description of what's wrong with the filter.
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An I/O error occurred with additional context.
    #[error("{context}: {source}")]
    IoWithContext {
        /// What operation was being performed.
        context: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML deserialization failed.
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization failed.
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// Errors reported by a [`SessionExecutor`](crate::executor::SessionExecutor).
///
/// These never reach broadcast callers; the engine records them in the
/// affected session's result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The connection to the session was lost.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// The reason for the connection loss.
        reason: String,
    },

    /// The process was terminated by a signal.
    #[error("terminated by signal {signal}")]
    Signal {
        /// The signal number.
        signal: i32,
    },

    /// The executor gave up after its own deadline.
    #[error("executor timed out after {duration:?}")]
    Timeout {
        /// The duration that elapsed.
        duration: Duration,
    },

    /// Any other executor failure.
    #[error("{message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for rust-broadcast operations.
pub type Result<T> = std::result::Result<T, BroadcastError>;

impl BroadcastError {
    /// Create a no-active-sessions error.
    pub fn no_active_sessions(target: impl Into<String>) -> Self {
        Self::NoActiveSessions {
            target: target.into(),
        }
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error with context.
    pub fn io_context(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoWithContext {
            context: context.into(),
            source,
        }
    }

    /// Wrap an I/O result with context.
    pub fn with_io_context<T>(result: std::io::Result<T>, context: impl Into<String>) -> Result<T> {
        result.map_err(|e| Self::io_context(context, e))
    }

    /// Check if this error was raised before any session executed.
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::UnknownGroup { .. } | Self::NoActiveSessions { .. }
        )
    }
}

impl ExecutionError {
    /// Create a connection lost error.
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            reason: reason.into(),
        }
    }

    /// Create a signal error.
    #[must_use]
    pub const fn signal(signal: i32) -> Self {
        Self::Signal { signal }
    }

    /// Create a generic executor error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BroadcastError::UnknownGroup { id: GroupId::new(7) };
        assert_eq!(err.to_string(), "group group-7 not found");

        let err = BroadcastError::no_active_sessions("group group-7");
        assert!(err.to_string().contains("nothing was executed"));
    }

    #[test]
    fn preflight_classification() {
        assert!(BroadcastError::UnknownGroup { id: GroupId::new(1) }.is_preflight());
        assert!(BroadcastError::no_active_sessions("sessions").is_preflight());
        assert!(!BroadcastError::UnknownSession { id: SessionId::new(1) }.is_preflight());
        assert!(!BroadcastError::config("bad").is_preflight());
    }

    #[test]
    fn io_with_context_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = BroadcastError::io_context("reading store", io_err);
        let msg = err.to_string();
        assert!(msg.contains("reading store"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn with_io_context_helper() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        let err = BroadcastError::with_io_context(result, "writing store").unwrap_err();
        assert!(err.to_string().contains("writing store"));

        let value = BroadcastError::with_io_context(Ok(42), "noop").unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn execution_error_display() {
        assert_eq!(
            ExecutionError::connection_lost("broken pipe").to_string(),
            "connection lost: broken pipe"
        );
        assert_eq!(ExecutionError::signal(9).to_string(), "terminated by signal 9");
        assert_eq!(ExecutionError::other("boom").to_string(), "boom");
    }
}
