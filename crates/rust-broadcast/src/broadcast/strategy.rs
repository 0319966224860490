//! Parallel and sequential execution strategies.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::unit::run_unit;
use crate::config::Settings;
use crate::executor::SessionExecutor;
use crate::result::SessionResult;
use crate::types::Session;

/// How the units of a broadcast are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Start every unit at once and wait for all of them.
    Parallel,
    /// Run units one after another in target order.
    Sequential {
        /// Skip the rest after the first failed unit.
        stop_on_first_error: bool,
    },
}

impl Strategy {
    /// Pick the strategy a broadcast's settings ask for.
    #[must_use]
    pub const fn from_settings(settings: &Settings) -> Self {
        if settings.parallel_execution {
            Self::Parallel
        } else {
            Self::Sequential {
                stop_on_first_error: settings.stop_on_first_error,
            }
        }
    }

    /// Get the strategy name used in log events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential { .. } => "sequential",
        }
    }

    /// Run `command` on every session and collect results in session order.
    pub(crate) async fn run<E: SessionExecutor>(
        self,
        executor: &E,
        sessions: &[Session],
        command: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Vec<SessionResult> {
        match self {
            Self::Parallel => run_parallel(executor, sessions, command, timeout, cancel).await,
            Self::Sequential {
                stop_on_first_error,
            } => {
                run_sequential(
                    executor,
                    sessions,
                    command,
                    timeout,
                    cancel,
                    stop_on_first_error,
                )
                .await
            }
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

async fn run_parallel<E: SessionExecutor>(
    executor: &E,
    sessions: &[Session],
    command: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<SessionResult> {
    let units = sessions
        .iter()
        .map(|session| run_unit(executor, session, command, timeout, cancel));
    join_all(units).await
}

async fn run_sequential<E: SessionExecutor>(
    executor: &E,
    sessions: &[Session],
    command: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    stop_on_first_error: bool,
) -> Vec<SessionResult> {
    let mut results = Vec::with_capacity(sessions.len());

    for (index, session) in sessions.iter().enumerate() {
        if cancel.is_cancelled() {
            debug!(remaining = sessions.len() - index, "Skipping after cancellation");
            results.extend(sessions[index..].iter().map(SessionResult::skipped));
            break;
        }

        let result = run_unit(executor, session, command, timeout, cancel).await;
        let failed = result.is_failed();
        results.push(result);

        if stop_on_first_error && failed {
            let rest = &sessions[index + 1..];
            if !rest.is_empty() {
                debug!(session = %session.id, skipped = rest.len(), "Stopping after first failure");
            }
            results.extend(rest.iter().map(SessionResult::skipped));
            break;
        }
    }

    results
}
