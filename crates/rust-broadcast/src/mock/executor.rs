//! Scripted executor.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::ExecutionError;
use crate::executor::{ExecutionOutput, SessionExecutor};
use crate::types::{Session, SessionId};

/// What the mock does for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Return output and an exit code.
    Output {
        /// Output text.
        output: String,
        /// Exit code.
        exit_code: i32,
        /// Delay before returning.
        delay: Duration,
    },
    /// Return an executor error.
    Error {
        /// Error to return.
        error: ExecutionError,
        /// Delay before returning.
        delay: Duration,
    },
    /// Never return.
    Hang,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::success("")
    }
}

impl MockResponse {
    /// Output with an exit code.
    pub fn output(output: impl Into<String>, exit_code: i32) -> Self {
        Self::Output {
            output: output.into(),
            exit_code,
            delay: Duration::ZERO,
        }
    }

    /// Output with exit code zero.
    pub fn success(output: impl Into<String>) -> Self {
        Self::output(output, 0)
    }

    /// An executor error.
    #[must_use]
    pub const fn error(error: ExecutionError) -> Self {
        Self::Error {
            error,
            delay: Duration::ZERO,
        }
    }

    /// A call that never completes.
    #[must_use]
    pub const fn hang() -> Self {
        Self::Hang
    }

    /// Delay the response. Has no effect on [`MockResponse::Hang`].
    #[must_use]
    pub fn delay(mut self, duration: Duration) -> Self {
        match &mut self {
            Self::Output { delay, .. } | Self::Error { delay, .. } => *delay = duration,
            Self::Hang => {}
        }
        self
    }
}

/// A recorded executor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// Target session.
    pub session_id: SessionId,
    /// Command text.
    pub command: String,
    /// Timeout passed by the engine.
    pub timeout: Duration,
}

/// A [`SessionExecutor`] that replays scripted responses.
///
/// Sessions without a script get the default response, which succeeds with
/// empty output.
#[derive(Debug, Default)]
pub struct MockExecutor {
    responses: HashMap<SessionId, MockResponse>,
    default_response: MockResponse,
    calls: Mutex<Vec<MockCall>>,
    completions: Mutex<Vec<SessionId>>,
}

impl MockExecutor {
    /// Create an executor where every session succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for one session.
    #[must_use]
    pub fn respond(mut self, session: SessionId, response: MockResponse) -> Self {
        self.responses.insert(session, response);
        self
    }

    /// Set the response for unscripted sessions.
    #[must_use]
    pub fn default_response(mut self, response: MockResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Calls that have started, in start order.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls that have started.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Sessions whose calls returned, in completion order.
    #[must_use]
    pub fn completions(&self) -> Vec<SessionId> {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn response_for(&self, session: SessionId) -> MockResponse {
        self.responses
            .get(&session)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }

    fn record_completion(&self, session: SessionId) {
        self.completions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session);
    }
}

impl SessionExecutor for MockExecutor {
    fn execute(
        &self,
        session: &Session,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<ExecutionOutput, ExecutionError>> + Send {
        async move {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(MockCall {
                    session_id: session.id,
                    command: command.to_string(),
                    timeout,
                });

            let result = match self.response_for(session.id) {
                MockResponse::Output {
                    output,
                    exit_code,
                    delay,
                } => {
                    pause(delay).await;
                    Ok(ExecutionOutput::new(output, exit_code))
                }
                MockResponse::Error { error, delay } => {
                    pause(delay).await;
                    Err(error)
                }
                MockResponse::Hang => std::future::pending().await,
            };
            self.record_completion(session.id);
            result
        }
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::fixtures;

    #[tokio::test]
    async fn default_response_succeeds() {
        let executor = MockExecutor::new();
        let s = fixtures::session(1, "a");
        let out = executor.execute(&s, "ls", Duration::from_secs(1)).await.unwrap();
        assert!(out.is_success());
        assert_eq!(executor.call_count(), 1);
        assert_eq!(executor.calls()[0].command, "ls");
    }

    #[tokio::test(start_paused = true)]
    async fn delays_order_completions() {
        let a = fixtures::session(1, "a");
        let b = fixtures::session(2, "b");
        let executor = MockExecutor::new()
            .respond(a.id, MockResponse::success("a").delay(Duration::from_millis(50)))
            .respond(b.id, MockResponse::success("b").delay(Duration::from_millis(10)));

        let (ra, rb) = tokio::join!(
            executor.execute(&a, "x", Duration::from_secs(1)),
            executor.execute(&b, "x", Duration::from_secs(1)),
        );
        assert_eq!(ra.unwrap().output, "a");
        assert_eq!(rb.unwrap().output, "b");
        assert_eq!(executor.completions(), vec![b.id, a.id]);
    }
}
