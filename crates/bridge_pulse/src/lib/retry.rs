use std::{fmt::Display, future::Future, time::Duration};

use crate::clock::Clock;

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Runs `op` until it succeeds or `max_attempts` is exhausted, sleeping `delay`
    /// on `clock` between attempts. `op` receives the 1-based attempt number.
    pub async fn run<C, F, Fut, T, E>(&self, clock: &C, mut op: F) -> Result<T, E>
    where
        C: Clock,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(attempt, max_attempts, error = %e, "Attempt failed, retrying");
                    clock.sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempts = attempt, error = %e, "All attempts failed");
                    return Err(e);
                }
            }
        }
    }
}
