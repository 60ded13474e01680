//! Caller-side retry with exponential backoff and jitter
//!
//! The executor never retries on its own. A retry here re-runs the whole
//! list/diff/transfer sequence, so objects uploaded by the failed attempt drop
//! out of the recomputed diff.

use crate::config::Config;
use crate::error::{Error, Result};
use std::time::Duration;
use tokio::time::sleep;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            jitter: 0.25,
        }
    }
}

impl From<&Config> for RetryConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay_ms: config.retry_delay_ms,
            ..Default::default()
        }
    }
}

/// Execute an async operation, re-running it on retryable errors
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                if attempt < config.max_retries {
                    let delay = calculate_delay(config, attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = config.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "Sync failed, re-running"
                    );
                    sleep(delay).await;
                }

                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::store("max retries exceeded")))
}

/// Calculate delay with exponential backoff and jitter
fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponential = config
        .base_delay_ms
        .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    let capped = std::cmp::min(exponential, config.max_delay_ms);

    let jitter_range = (capped as f64 * config.jitter) as u64;
    let jitter = if jitter_range > 0 {
        rand_jitter(jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped.saturating_add(jitter))
}

/// Jitter from the clock's sub-second nanos
fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % max
}
