//! Typed errors for the backend boundary.
//!
//! The hosted backend reports throttling either as an HTTP 429 or as an
//! error body carrying the code `RATE_LIMIT_EXCEEDED`, optionally with an
//! ISO-8601 `reset` timestamp. Classification happens once, in the client
//! adapter, so everything above it can match on `BackendError::RateLimited`
//! instead of probing response shapes.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error code the backend uses for throttled requests.
pub const RATE_LIMIT_CODE: &str = "RATE_LIMIT_EXCEEDED";

#[derive(Debug, Error)]
pub enum BackendError {
  /// The backend throttled the request. `reset_at` is the server's hint
  /// for when retrying becomes safe, when it provided one.
  #[error("rate limited by backend{}", reset_suffix(.reset_at))]
  RateLimited { reset_at: Option<DateTime<Utc>> },

  /// Non-2xx response that is not a rate limit.
  #[error("backend returned {status}: {message}")]
  Api { status: u16, message: String },

  /// Transport-level failure (connection, TLS, body decode).
  #[error("backend request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The fetch task stopped without producing a result.
  #[error("fetch aborted before completion")]
  Aborted,
}

impl BackendError {
  pub fn is_rate_limited(&self) -> bool {
    matches!(self, BackendError::RateLimited { .. })
  }

  /// Server reset hint, if this is a rate-limit error that carried one.
  pub fn reset_at(&self) -> Option<DateTime<Utc>> {
    match self {
      BackendError::RateLimited { reset_at } => *reset_at,
      _ => None,
    }
  }
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
  match reset_at {
    Some(ts) => format!(", resets at {}", ts.to_rfc3339()),
    None => String::new(),
  }
}
