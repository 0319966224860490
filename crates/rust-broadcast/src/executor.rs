//! The per-session command runner.
//!
//! The engine never talks to a shell, SSH connection or container runtime
//! itself. Callers inject a [`SessionExecutor`] that knows how to reach a
//! [`Session`] and run one command there.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;
use crate::types::Session;

/// What an executor reports for one finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// Captured output.
    pub output: String,
    /// Process exit code. Zero is success.
    pub exit_code: i32,
}

impl ExecutionOutput {
    /// Create an output record.
    pub fn new(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }

    /// A successful run with the given output.
    pub fn success(output: impl Into<String>) -> Self {
        Self::new(output, 0)
    }

    /// Check if the exit code signals success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs a command against one session.
///
/// `timeout` is advisory: the engine enforces it independently and drops
/// the returned future once it expires or the broadcast is cancelled, so
/// implementations must be cancel-safe.
pub trait SessionExecutor: Send + Sync {
    /// Execute `command` on `session`.
    fn execute(
        &self,
        session: &Session,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<ExecutionOutput, ExecutionError>> + Send;
}

impl<E: SessionExecutor> SessionExecutor for Arc<E> {
    fn execute(
        &self,
        session: &Session,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<ExecutionOutput, ExecutionError>> + Send {
        (**self).execute(session, command, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_success() {
        assert!(ExecutionOutput::success("ok").is_success());
        assert!(!ExecutionOutput::new("boom", 2).is_success());
    }
}
