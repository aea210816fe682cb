//! Exponential backoff for throttled store operations.

use crate::error::StoreError;

use rand::Rng;
use std::{future, time};

/// Retry policy applied at the table store boundary.
///
/// Only errors classified by [`StoreError::is_retryable`] are retried. The
/// delay before retry `n` (0-based) is `initial_delay * 2^n`, capped at
/// `max_delay`; with `jitter` enabled half of it is replaced by a random share.
///
/// ```rust
/// use dynamodb_data_api::retry::RetryConfig;
/// use std::time::Duration;
///
/// let retry = RetryConfig {
///     max_retries: 3,
///     initial_delay: Duration::from_millis(50),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: time::Duration,
    /// Upper bound for any single delay.
    pub max_delay: time::Duration,
    /// Whether to randomize half of each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: time::Duration::from_millis(100),
            max_delay: time::Duration::from_millis(1600),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay to wait before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> time::Duration {
        let exponential = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let capped = exponential.min(self.max_delay);
        if !self.jitter {
            return capped;
        }
        let half = capped / 2;
        let spread = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
        half + time::Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

/// Run `attempt` until it succeeds, fails permanently, or retries run out.
pub(crate) async fn retry<O, F, Fut>(
    config: &RetryConfig,
    operation: &'static str,
    mut attempt: F,
) -> Result<O, StoreError>
where
    F: FnMut() -> Fut,
    Fut: future::Future<Output = Result<O, StoreError>>,
{
    let mut retries = 0;
    loop {
        match attempt().await {
            Ok(output) => return Ok(output),
            Err(err) if err.is_retryable() && retries < config.max_retries => {
                let delay = config.delay(retries);
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    operation,
                    retry = retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying throttled operation"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = operation;
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
