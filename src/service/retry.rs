use crate::service::ServiceResult;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Retry settings for metadata calls.
///
/// The default is a single attempt, so a transient failure is treated like missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or attempts run out.
    pub fn run<T, F>(&self, operation: &str, mut call: F) -> ServiceResult<T>
    where
        F: FnMut() -> ServiceResult<T>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.backoff_ms;
        let mut attempt = 1;

        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    debug!(
                        "{} failed (attempt {}/{}): {}; retrying in {} ms",
                        operation, attempt, attempts, e, backoff
                    );
                    if backoff > 0 {
                        thread::sleep(Duration::from_millis(backoff));
                    }
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
