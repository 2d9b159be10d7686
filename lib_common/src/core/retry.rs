//! # Fixed-Delay Retry
//!
//! The single retry combinator used by every "try again in N seconds" path. There is no
//! backoff: the same delay separates every attempt. An unbounded policy keeps going until
//! the operation succeeds, which is what the subscription loops use in production; tests
//! shrink the delay or bound the attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay between retries shared by the guard and the refresher.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep between a failed attempt and the next one.
    pub delay: Duration,
    /// Total attempts allowed; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn forever(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    pub const fn bounded(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts: Some(max_attempts),
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(DEFAULT_RETRY_DELAY)
    }
}

/// Runs `op` until it returns `Ok`, sleeping `policy.delay` after each failure.
///
/// With a bounded policy the last error is returned once the attempts are used up.
/// With an unbounded policy this only returns `Ok`.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                if attempts > 1 {
                    log::info!("{} succeeded after {} attempts", what, attempts);
                }
                return Ok(value);
            }
            Err(e) if policy.exhausted(attempts) => {
                log::error!("{} failed after {} attempts, giving up: {}", what, attempts, e);
                return Err(e);
            }
            Err(e) => {
                log::warn!(
                    "{} failed: {}. Retry after {} seconds...",
                    what,
                    e,
                    policy.delay.as_secs_f32()
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
