//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::{ClaimWiseError, ErrorCategory, ErrorSeverity};

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::types::DEFAULT_RETRIES,
            base_delay: crate::types::DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait inserted after failed attempt `attempt` (1-based):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable
    /// error, or runs out of attempts. The closure receives the 1-based
    /// attempt number.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, ClaimWiseError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClaimWiseError>>,
    {
        if self.max_attempts == 0 {
            return Err(ClaimWiseError::new(
                ErrorCategory::ClientError,
                ErrorSeverity::Low,
                "Retry policy allows zero attempts",
            ));
        }

        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.max_attempts {
                        return Err(e);
                    }

                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        category = %e.category(),
                        error = %e,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_base() {
        let policy = RetryPolicy::new(4, Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(1 << 31));
    }
}
