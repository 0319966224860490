//! Broadcast results and their aggregation.

use std::fmt::Write as _;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::types::{BroadcastId, Session, SessionId};

/// Exit code recorded when a session produced no real exit status.
pub const NO_EXIT_CODE: i32 = -1;

/// Error message recorded for a unit interrupted by cancellation.
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Prefix of the error message recorded for a timed-out unit.
pub const TIMED_OUT_PREFIX: &str = "timed out after";

/// Outcome of one session within a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Exit code zero.
    Success,
    /// Non-zero exit, executor error, timeout or cancellation.
    Failed,
    /// Reserved for executors that distinguish a timeout from a failure.
    /// The engine itself reports timeouts as [`ResultStatus::Failed`].
    Timeout,
    /// Never started.
    Skipped,
}

impl ResultStatus {
    /// Get the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    /// The session this result belongs to.
    pub session_id: SessionId,
    /// Session name at the time of the broadcast.
    pub session_name: String,
    /// Outcome.
    pub status: ResultStatus,
    /// Captured output.
    pub output: String,
    /// Error message, if any.
    pub error: Option<String>,
    /// Exit code, or [`NO_EXIT_CODE`].
    pub exit_code: i32,
    /// Wall-clock time spent on this session.
    pub execution_time: Duration,
    /// When the result was recorded.
    pub timestamp: SystemTime,
}

impl SessionResult {
    /// Result for a session that exited normally.
    pub fn completed(
        session: &Session,
        output: impl Into<String>,
        exit_code: i32,
        execution_time: Duration,
    ) -> Self {
        let status = if exit_code == 0 {
            ResultStatus::Success
        } else {
            ResultStatus::Failed
        };
        Self {
            session_id: session.id,
            session_name: session.name.clone(),
            status,
            output: output.into(),
            error: None,
            exit_code,
            execution_time,
            timestamp: SystemTime::now(),
        }
    }

    /// Result for a session that did not produce an exit status.
    pub fn failed(session: &Session, error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            session_id: session.id,
            session_name: session.name.clone(),
            status: ResultStatus::Failed,
            output: String::new(),
            error: Some(error.into()),
            exit_code: NO_EXIT_CODE,
            execution_time,
            timestamp: SystemTime::now(),
        }
    }

    /// Result for a session that never started.
    #[must_use]
    pub fn skipped(session: &Session) -> Self {
        Self {
            session_id: session.id,
            session_name: session.name.clone(),
            status: ResultStatus::Skipped,
            output: String::new(),
            error: None,
            exit_code: NO_EXIT_CODE,
            execution_time: Duration::ZERO,
            timestamp: SystemTime::now(),
        }
    }

    /// Check if the session succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Check if the session failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == ResultStatus::Failed
    }

    /// Check if the session was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == ResultStatus::Skipped
    }

    /// Check if the session ran out of time.
    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        self.status == ResultStatus::Timeout
            || (self.is_failed()
                && self
                    .error
                    .as_deref()
                    .is_some_and(|e| e.starts_with(TIMED_OUT_PREFIX)))
    }

    /// Check if the session was interrupted by cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.is_failed() && self.error.as_deref() == Some(CANCELLED_MESSAGE)
    }
}

/// Overall outcome of a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every session succeeded.
    Success,
    /// Some sessions succeeded.
    Partial,
    /// No session succeeded.
    Failed,
}

impl OverallStatus {
    /// Derive the overall status from success and failure counts.
    #[must_use]
    pub const fn from_counts(successful: usize, failed: usize) -> Self {
        if failed == 0 {
            Self::Success
        } else if successful == 0 {
            Self::Failed
        } else {
            Self::Partial
        }
    }

    /// Get the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Whether a broadcast ran to the end or observed cancellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastState {
    /// Every unit finished on its own.
    #[default]
    Completed,
    /// The broadcast's cancellation token fired.
    Cancelled,
}

/// Totals over a broadcast's session results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of results.
    pub total_sessions: usize,
    /// Results with [`ResultStatus::Success`].
    pub successful_sessions: usize,
    /// Everything else, skipped sessions included.
    pub failed_sessions: usize,
    /// Mean execution time.
    pub average_execution_time: Duration,
}

impl Summary {
    /// Summarise a list of results.
    ///
    /// Skipped entries count as failures. They are included in the average
    /// execution time unless `exclude_skipped` is set.
    #[must_use]
    pub fn from_results(results: &[SessionResult], exclude_skipped: bool) -> Self {
        let total_sessions = results.len();
        let successful_sessions = results.iter().filter(|r| r.is_success()).count();

        let timed: Vec<Duration> = results
            .iter()
            .filter(|r| !(exclude_skipped && r.is_skipped()))
            .map(|r| r.execution_time)
            .collect();
        let average_execution_time = mean(&timed);

        Self {
            total_sessions,
            successful_sessions,
            failed_sessions: total_sessions - successful_sessions,
            average_execution_time,
        }
    }

    /// Fraction of sessions that succeeded, or `None` for an empty summary.
    #[must_use]
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_sessions == 0 {
            None
        } else {
            Some(self.successful_sessions as f64 / self.total_sessions as f64)
        }
    }
}

pub(crate) fn mean(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = durations.iter().sum();
    let count = u32::try_from(durations.len()).unwrap_or(u32::MAX);
    total / count
}

/// Complete record of one broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    /// Broadcast ID.
    pub broadcast_id: BroadcastId,
    /// The command that was sent.
    pub command: String,
    /// When execution started.
    pub start_time: SystemTime,
    /// When the last unit finished.
    pub end_time: SystemTime,
    /// One entry per target session, in target order.
    pub results: Vec<SessionResult>,
    /// Overall outcome.
    pub overall_status: OverallStatus,
    /// Totals.
    pub summary: Summary,
    /// Whether cancellation was observed.
    pub state: BroadcastState,
    /// Combined output of every session that ran.
    pub aggregated_output: Option<String>,
}

impl BroadcastResult {
    /// Assemble a result, ending now.
    pub fn new(
        broadcast_id: BroadcastId,
        command: impl Into<String>,
        start_time: SystemTime,
        results: Vec<SessionResult>,
        state: BroadcastState,
        exclude_skipped: bool,
    ) -> Self {
        let summary = Summary::from_results(&results, exclude_skipped);
        Self {
            broadcast_id,
            command: command.into(),
            start_time,
            end_time: SystemTime::now(),
            overall_status: OverallStatus::from_counts(
                summary.successful_sessions,
                summary.failed_sessions,
            ),
            results,
            summary,
            state,
            aggregated_output: None,
        }
    }

    /// Fill in [`aggregated_output`](Self::aggregated_output).
    #[must_use]
    pub fn with_aggregated_output(mut self) -> Self {
        self.aggregated_output = Some(aggregate_output(&self.results));
        self
    }

    /// Wall-clock duration of the whole broadcast.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time
            .duration_since(self.start_time)
            .unwrap_or_default()
    }

    /// Check if every session succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.overall_status == OverallStatus::Success
    }

    /// Check if the broadcast was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == BroadcastState::Cancelled
    }

    /// Find the result for a session.
    #[must_use]
    pub fn get(&self, session: SessionId) -> Option<&SessionResult> {
        self.results.iter().find(|r| r.session_id == session)
    }
}

/// Concatenate the output of every non-skipped result under a name header.
#[must_use]
pub fn aggregate_output(results: &[SessionResult]) -> String {
    let mut out = String::new();
    for result in results.iter().filter(|r| !r.is_skipped()) {
        let _ = writeln!(out, "=== {} ===", result.session_name);
        out.push_str(&result.output);
        if !result.output.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
