//! Bounded retry with exponential backoff.
//!
//! Every job-store, blob, queue-send and completion call goes through
//! [`RetryPolicy::run`]. The delay after failed attempt `n` (1-based) is
//! `base_delay * factor^(n-1)`. There is no jitter and no circuit breaking;
//! after the last attempt the final error is returned unchanged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::warn;

/// Classifies errors the retry loop may try again.
///
/// Errors that can never succeed on a repeat (malformed input, refused
/// terminal transitions) report `false` and are returned immediately.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            factor,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.base_delay.mul_f64(self.factor.powi(exponent))
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached. A policy with `max_attempts == 0` still
    /// makes one attempt.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    if max_attempts > 1 {
                        warn!("{} failed after {} attempts: {}", label, attempt, e);
                    }
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} attempt {}/{} failed, retrying in {:?}: {}",
                        label, attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
