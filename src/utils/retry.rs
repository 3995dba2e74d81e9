//! Retry utilities: backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter. Only the initial store
//! connection is retried; operations after startup surface errors directly.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::ConnectRetryConfig;

/// Backoff for store connection retries at startup.
///
/// Defaults:
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff(config: &ConnectRetryConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_delay_ms))
        .with_max_delay(Duration::from_millis(config.max_delay_ms))
        .with_max_times(config.max_attempts)
        .with_jitter()
}
