//! Serde-deserializable types matching the hosted backend's responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{BackendError, RATE_LIMIT_CODE};

use super::types::{EventStatus, PublishedEvent};

// ============================================================================
// Event documents
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventDocument {
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub location: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub event_date: DateTime<Utc>,
  pub status: EventStatus,
  pub cover_image: Option<String>,
  pub sdg_focus: Option<String>,
  pub host_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub documents: Vec<ApiEventDocument>,
  #[serde(default)]
  pub total: u64,
}

// ============================================================================
// Error body
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorDetails {
  pub code: Option<String>,
  /// ISO-8601 timestamp for when a rate limit resets
  pub reset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub details: ApiErrorDetails,
}

impl ApiErrorBody {
  /// Classify an error response into the typed taxonomy.
  ///
  /// Throttling is signaled by HTTP 429 or by the `RATE_LIMIT_EXCEEDED`
  /// code in the body; everything else is a plain API error.
  pub fn into_error(self, status: u16) -> BackendError {
    let coded = self.details.code.as_deref() == Some(RATE_LIMIT_CODE);
    if status == 429 || coded {
      let reset_at = self
        .details
        .reset
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc));
      BackendError::RateLimited { reset_at }
    } else {
      BackendError::Api {
        status,
        message: self.message,
      }
    }
  }
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl ApiEventDocument {
  pub fn into_event(self) -> PublishedEvent {
    PublishedEvent {
      id: self.id,
      title: self.title,
      location: self.location,
      latitude: self.latitude,
      longitude: self.longitude,
      event_date: self.event_date,
      status: self.status,
      cover_image: self.cover_image,
      sdg_focus: self.sdg_focus,
      host_id: self.host_id,
    }
  }
}
