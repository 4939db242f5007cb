//! Bounded retry with exponential backoff
//!
//! Every mutating control-plane call runs under the same policy: errors
//! the caller classifies as transient are retried with exponential
//! backoff, the first fatal error aborts the loop, and the whole loop
//! stops once a wall-clock ceiling has elapsed.

use crate::error::RetryError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Retry policy for provider operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wall-clock budget for the whole loop, first attempt included
    pub ceiling: Duration,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Cap for a single backoff delay
    pub max_delay: Duration,

    /// Backoff multiplier
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            ceiling: Duration::from_secs(300),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after attempt `attempt` (zero-based), capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis((millis as u64).min(self.max_delay.as_millis() as u64))
    }

    /// Run `op` until it succeeds, fails fatally, or the budget runs out.
    ///
    /// `is_retryable` decides which errors are worth another attempt. The
    /// loop never sleeps past the ceiling: if the next backoff would cross
    /// it, the last error is returned as [`RetryError::Exhausted`].
    pub async fn run<T, E, F, Fut>(
        &self,
        is_retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !is_retryable(&err) => return Err(RetryError::Fatal(err)),
                Err(err) => {
                    let delay = self.delay_for_attempt(attempt);
                    attempt += 1;

                    if started.elapsed() + delay >= self.ceiling {
                        return Err(RetryError::Exhausted {
                            ceiling: self.ceiling,
                            attempts: attempt,
                            source: err,
                        });
                    }

                    tracing::debug!("Retrying after {:?} (attempt {}): {}", delay, attempt, err);
                    sleep(delay).await;
                }
            }
        }
    }
}
