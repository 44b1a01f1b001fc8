//! Bounded retry with jittered exponential backoff for GitHub calls.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::errors::{Result, SobaError};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default)]
pub struct RetryHandler {
    config: RetryConfig,
}

impl RetryHandler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Run `operation`, retrying transient failures with backoff. Anything
    /// non-transient is returned immediately.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<SobaError> = None;

        for attempt in 0..self.config.max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    warn!(
                        attempt = attempt + 1,
                        max = self.config.max_attempts,
                        error = %err,
                        "transient GitHub failure"
                    );
                    last_error = Some(err);
                    if attempt + 1 < self.config.max_attempts {
                        tokio::time::sleep(self.delay_for(attempt)).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| SobaError::internal("retry loop exited without an error")))
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let capped = exp.min(self.config.max_delay);
        // Full jitter keeps concurrent watchers from hammering in lockstep.
        let jittered = rand::rng().random_range(0..=capped.as_millis() as u64);
        Duration::from_millis(jittered.max(1))
    }
}
