//! Exponential backoff around resolver backend calls

use std::future::Future;
use std::time::Duration;

use depsweep_core::DepsweepError;
use tracing::debug;

use crate::RegistryResult;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl RetryConfig {
    /// Run every operation exactly once
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        std::cmp::min(
            Duration::from_millis((delay.as_millis() as f64 * self.multiplier) as u64),
            self.max_delay,
        )
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Run `operation`, retrying only while it fails with `BackendUnavailable`.
///
/// Spec and configuration errors are deterministic and returned at once.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> RegistryResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = RegistryResult<T>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                let transient = matches!(error, DepsweepError::BackendUnavailable { .. });
                if !transient || attempt >= config.max_retries {
                    return Err(error);
                }

                attempt += 1;
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "Retrying backend call");
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            },
        }
    }
}
