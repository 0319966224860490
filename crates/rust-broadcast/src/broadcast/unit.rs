//! One session's share of a broadcast.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::executor::SessionExecutor;
use crate::metrics::Timer;
use crate::result::{CANCELLED_MESSAGE, SessionResult};
use crate::types::Session;
use crate::util::timeout::{TimeoutExt, timed_out_message};

/// Run `command` on one session, bounded by `timeout` and `cancel`.
///
/// Never fails: every outcome is folded into the returned result.
pub(crate) async fn run_unit<E: SessionExecutor>(
    executor: &E,
    session: &Session,
    command: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> SessionResult {
    let timer = Timer::start();

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        res = executor.execute(session, command, timeout).with_timeout(timeout) => Some(res),
    };
    let elapsed = timer.stop();

    match outcome {
        None => {
            debug!(session = %session.id, "Unit cancelled");
            SessionResult::failed(session, CANCELLED_MESSAGE, elapsed)
        }
        Some(Err(_elapsed)) => {
            warn!(session = %session.id, ?timeout, "Unit timed out");
            SessionResult::failed(session, timed_out_message(timeout), elapsed)
        }
        Some(Ok(Err(e))) => {
            debug!(session = %session.id, error = %e, "Executor error");
            SessionResult::failed(session, e.to_string(), elapsed)
        }
        Some(Ok(Ok(out))) => {
            debug!(
                session = %session.id,
                exit_code = out.exit_code,
                elapsed_ms = elapsed.as_millis() as u64,
                "Unit finished"
            );
            SessionResult::completed(session, out.output, out.exit_code, elapsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;
    use crate::mock::{MockExecutor, MockResponse, fixtures};
    use crate::result::{NO_EXIT_CODE, ResultStatus};

    #[tokio::test]
    async fn success_and_failure_by_exit_code() {
        let ok = fixtures::session(1, "ok");
        let bad = fixtures::session(2, "bad");
        let executor = MockExecutor::new()
            .respond(ok.id, MockResponse::output("hi", 0))
            .respond(bad.id, MockResponse::output("nope", 2));
        let token = CancellationToken::new();

        let r = run_unit(&executor, &ok, "echo", Duration::from_secs(1), &token).await;
        assert_eq!(r.status, ResultStatus::Success);
        assert_eq!(r.output, "hi");

        let r = run_unit(&executor, &bad, "echo", Duration::from_secs(1), &token).await;
        assert_eq!(r.status, ResultStatus::Failed);
        assert_eq!(r.exit_code, 2);
    }

    #[tokio::test]
    async fn executor_error_is_failed() {
        let s = fixtures::session(1, "a");
        let executor = MockExecutor::new()
            .respond(s.id, MockResponse::error(ExecutionError::connection_lost("eof")));

        let r = run_unit(&executor, &s, "ls", Duration::from_secs(1), &CancellationToken::new()).await;
        assert_eq!(r.status, ResultStatus::Failed);
        assert_eq!(r.exit_code, NO_EXIT_CODE);
        assert_eq!(r.error.as_deref(), Some("connection lost: eof"));
    }

    #[tokio::test(start_paused = true)]
    async fn hang_times_out() {
        let s = fixtures::session(1, "a");
        let executor = MockExecutor::new().respond(s.id, MockResponse::hang());

        let r = run_unit(&executor, &s, "sleep", Duration::from_millis(100), &CancellationToken::new()).await;
        assert_eq!(r.status, ResultStatus::Failed);
        assert_eq!(r.exit_code, NO_EXIT_CODE);
        assert_eq!(r.error.as_deref(), Some("timed out after 100ms"));
        assert!(r.execution_time >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn pre_cancelled_token_wins() {
        let s = fixtures::session(1, "a");
        let executor = MockExecutor::new();
        let token = CancellationToken::new();
        token.cancel();

        let r = run_unit(&executor, &s, "ls", Duration::from_secs(1), &token).await;
        assert_eq!(r.error.as_deref(), Some(CANCELLED_MESSAGE));
        assert_eq!(executor.call_count(), 0);
    }
}
