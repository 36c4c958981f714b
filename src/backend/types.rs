use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an event as stored in the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
  Draft,
  Published,
  Ongoing,
  Completed,
}

impl EventStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      EventStatus::Draft => "draft",
      EventStatus::Published => "published",
      EventStatus::Ongoing => "ongoing",
      EventStatus::Completed => "completed",
    }
  }
}

/// A Global Goals Jam event as shown in the public listings.
///
/// Coordinates are optional and may be numerically invalid (non-finite)
/// due to upstream data entry; consumers that need them must check with
/// [`PublishedEvent::valid_coordinates`].
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
  pub id: String,
  pub title: String,
  /// Free-text location (city, region, country in no fixed format)
  pub location: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub event_date: DateTime<Utc>,
  pub status: EventStatus,
  pub cover_image: Option<String>,
  pub sdg_focus: Option<String>,
  pub host_id: Option<String>,
}

impl PublishedEvent {
  /// Coordinates, if both are present and finite.
  pub fn valid_coordinates(&self) -> Option<(f64, f64)> {
    match (self.latitude, self.longitude) {
      (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
      _ => None,
    }
  }
}

/// Payload for creating or updating an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
  pub title: String,
  pub location: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub latitude: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub longitude: Option<f64>,
  pub event_date: DateTime<Utc>,
  pub status: EventStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cover_image: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sdg_focus: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub host_id: Option<String>,
}

/// A coordinate correction for a single event, as produced by the
/// geocoding fixer and persisted via upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePatch {
  pub id: String,
  pub latitude: f64,
  pub longitude: f64,
}
