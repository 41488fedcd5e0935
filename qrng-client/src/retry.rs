//! Retry logic with exponential backoff and jitter
//!
//! Board calls are blocking, so the policy sleeps the calling thread between
//! attempts. An exhausted budget surfaces as [`Error::NetTimeout`] when the
//! last attempt timed out and [`Error::NetRetriesExceeded`] otherwise.

use crate::{Error, Result};
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Add jitter to prevent thundering herd
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Execute operation with retry logic
    pub fn execute<F, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            attempt += 1;

            match operation() {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Operation failed (attempt {}/{}): {}. Retrying after {:?}",
                        attempt, self.max_attempts, e, backoff
                    );

                    sleep(backoff);

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );

                    if self.jitter {
                        backoff = self.add_jitter(backoff);
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!("Operation failed after {} attempts: {}", attempt, e);
                    return Err(if e.is_timeout() {
                        Error::NetTimeout
                    } else {
                        Error::NetRetriesExceeded { attempts: attempt }
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn add_jitter(&self, duration: Duration) -> Duration {
        use rand::Rng;
        let jitter_ms = rand::thread_rng().gen_range(0..=duration.as_millis() / 4);
        duration + Duration::from_millis(jitter_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_retry_success() {
        let mut attempts = 0;

        let result = quick_policy(5).execute(|| {
            attempts += 1;
            if attempts < 3 {
                Err(Error::Transient("HTTP 502".into()))
            } else {
                Ok(42)
            }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_retry_exhausted() {
        let result = quick_policy(2).execute(|| Err::<(), _>(Error::Transient("HTTP 500".into())));
        assert!(matches!(result, Err(Error::NetRetriesExceeded { attempts: 2 })));
    }

    #[test]
    fn test_timeout_exhausted() {
        let result = quick_policy(3).execute(|| Err::<(), _>(Error::NetTimeout));
        assert!(matches!(result, Err(Error::NetTimeout)));
    }

    #[test]
    fn test_non_retryable_returns_immediately() {
        let mut attempts = 0;
        let result = quick_policy(5).execute(|| {
            attempts += 1;
            Err::<(), _>(Error::WrongDataFormat("bad hex".into()))
        });
        assert!(matches!(result, Err(Error::WrongDataFormat(_))));
        assert_eq!(attempts, 1);
    }
}
