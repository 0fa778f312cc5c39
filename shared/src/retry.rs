use std::future::Future;
use std::time::Duration;

use crate::error::ErrorKind;

/// Timer-based suspension, provided by whichever runtime hosts the client.
pub trait Sleeper {
    type Sleep: Future<Output = ()> + 'static;

    fn sleep(&self, duration: Duration) -> Self::Sleep;
}

/// Linear backoff for transient inference failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `n` (1-based): `base_delay * n`.
    pub fn delay_before(&self, retry: u32) -> Duration {
        self.base_delay * retry
    }

    /// `attempt` is the 0-based number of the attempt that just failed.
    pub fn should_retry(&self, kind: ErrorKind, attempt: u32) -> bool {
        kind.is_retryable() && attempt < self.max_retries
    }
}
