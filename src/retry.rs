//! Retry helper for rate-limited backend operations.
//!
//! Wraps one async operation and retries it with exponential backoff when
//! the backend reports throttling. Any other error is returned immediately;
//! retrying those is not this layer's job.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::error::BackendError;

/// Margin added on top of a server-provided reset timestamp, so the retry
/// lands after the window actually reopens.
const RESET_MARGIN: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
  /// Additional attempts after the first one.
  pub retries: u32,
  /// Backoff for the first retry; doubles on each subsequent one.
  pub initial_delay: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      retries: 4,
      initial_delay: Duration::from_millis(500),
    }
  }
}

impl RetryConfig {
  /// Backoff before retry number `attempt` (zero-based), respecting the
  /// server's reset hint when one is available.
  fn delay_for(&self, attempt: u32, err: &BackendError) -> Duration {
    let mut delay = self.initial_delay * 2u32.saturating_pow(attempt);
    if let Some(reset_at) = err.reset_at() {
      let until_reset = (reset_at - Utc::now()).to_std().unwrap_or_default() + RESET_MARGIN;
      delay = delay.max(until_reset);
    }
    delay
  }
}

/// Run `op`, retrying on rate-limit errors per `config`.
///
/// Each invocation starts a fresh attempt counter. On exhaustion the last
/// rate-limit error is returned.
pub async fn with_rate_limit_retry<T, F, Fut>(
  config: RetryConfig,
  mut op: F,
) -> Result<T, BackendError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, BackendError>>,
{
  let mut attempt = 0u32;
  loop {
    match op().await {
      Ok(value) => return Ok(value),
      Err(err) if err.is_rate_limited() && attempt < config.retries => {
        let delay = config.delay_for(attempt, &err);
        attempt += 1;
        warn!(
          attempt,
          delay_ms = delay.as_millis() as u64,
          "rate limited, backing off before retry"
        );
        tokio::time::sleep(delay).await;
      }
      Err(err) => return Err(err),
    }
  }
}
