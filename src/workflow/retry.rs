//! Fixed-delay retry for transient external-call failures.
//!
//! Applied to index operations and document downloads. Generation is excluded:
//! its recovery mechanism is the ordered provider fallback, and retrying there
//! would multiply provider calls across the chain.

use crate::config::Config;
use std::future::Future;
use std::time::Duration;

/// Retry budget for transient failures of one external operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts allowed after the initial call.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Extract the retry policy from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Run `call`, retrying up to `policy.max_retries` times while `is_transient`
/// holds for the returned error. Non-transient errors propagate immediately.
pub(crate) async fn with_retries<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    is_transient: impl Fn(&E) -> bool,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_retries && is_transient(&error) => {
                attempt += 1;
                tracing::warn!(
                    operation,
                    attempt,
                    max_retries = policy.max_retries,
                    error = %error,
                    "Transient failure; retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
