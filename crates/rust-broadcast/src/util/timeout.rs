//! Timeout utilities.
//!
//! Every executor call is bounded by the broadcast's per-session timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Timeout, timeout};

use crate::result::TIMED_OUT_PREFIX;

/// Extension trait for adding timeouts to futures.
pub trait TimeoutExt: Sized {
    /// Wrap this future with a timeout.
    fn with_timeout(self, duration: Duration) -> Timeout<Self>;
}

impl<F: Future> TimeoutExt for F {
    fn with_timeout(self, duration: Duration) -> Timeout<Self> {
        timeout(duration, self)
    }
}

/// Render the error message recorded for a timed-out session.
#[must_use]
pub fn timed_out_message(duration: Duration) -> String {
    format!("{TIMED_OUT_PREFIX} {duration:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_ext_passes_through() {
        let result = async { 42 }.with_timeout(Duration::from_secs(1)).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_ext_elapses() {
        let result = std::future::pending::<()>().with_timeout(Duration::from_millis(50)).await;
        assert!(result.is_err());
    }

    #[test]
    fn message_format() {
        assert_eq!(timed_out_message(Duration::from_secs(30)), "timed out after 30s");
        assert_eq!(
            timed_out_message(Duration::from_millis(250)),
            "timed out after 250ms"
        );
    }
}
