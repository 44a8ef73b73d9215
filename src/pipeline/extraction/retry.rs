use std::time::{Duration, Instant};

use super::types::CancellationToken;
use super::ExtractionError;
use crate::config::RetryConfig;

/// Sleep granularity while waiting out a backoff, so cancellation is noticed.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Bounded in-tier retry for transient collaborator failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds, fails fatally, or the retry budget is spent.
    ///
    /// Transient errors wait for the server's `Retry-After` when given, else the
    /// fixed backoff. Cancellation is checked before every attempt.
    pub fn run<T, F>(
        &self,
        tier: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, ExtractionError>
    where
        F: FnMut() -> Result<T, ExtractionError>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let wait = e.retry_after().unwrap_or(self.backoff);
                    tracing::warn!(
                        tier,
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    attempt += 1;
                    sleep_unless_cancelled(wait, cancel);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn sleep_unless_cancelled(wait: Duration, cancel: &CancellationToken) {
    let deadline = Instant::now() + wait;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep(CANCEL_POLL.min(deadline - now));
    }
}
