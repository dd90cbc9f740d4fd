//! Bounded retry with exponential backoff for model calls.

use std::future::Future;
use std::time::Duration;
use coupler_config::CouplerConfig;
use coupler_core::error::{CouplerError, ProviderError};
use tracing::{debug, warn};

use crate::model::millis;

/// How often, and how patiently, a failed model call is repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one; 1 disables retry.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CouplerConfig::default())
    }
}

impl RetryPolicy {
    /// A single attempt; failures surface unchanged.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// `max_attempts` attempts with no delay in between (for tests and local models).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &CouplerConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }

    /// Delay before attempt `attempt + 1`, after `attempt` failed with `error`.
    pub fn delay_after(&self, attempt: u32, error: &CouplerError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);

        match error {
            CouplerError::ModelCallFailure(ProviderError::RateLimited { retry_after_secs }) => {
                backoff.max(Duration::from_secs(*retry_after_secs))
            }
            _ => backoff,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, CouplerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CouplerError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() || self.max_attempts <= 1 {
                return Err(error);
            }

            if attempt >= self.max_attempts {
                warn!(call = label, attempts = attempt, error = %error, "Model call retries exhausted");
                return Err(CouplerError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.delay_after(attempt, &error);
            debug!(
                call = label,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = millis(delay),
                error = %error,
                "Model call failed, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
