//! Local coordinate patching for an already-fetched collection.

use crate::backend::types::{CoordinatePatch, PublishedEvent};

/// Return a copy of `events` with coordinates overwritten for every record
/// that has a matching patch.
///
/// Records without a patch pass through unchanged; patch ids that match
/// nothing are ignored. The input is never mutated, and no fetch or
/// invalidation is implied: callers use this after a coordinate-only write
/// that the backend has already accepted.
pub fn apply_local_patch(
  events: &[PublishedEvent],
  patches: &[CoordinatePatch],
) -> Vec<PublishedEvent> {
  events
    .iter()
    .map(|event| match patches.iter().find(|p| p.id == event.id) {
      Some(patch) => {
        let mut patched = event.clone();
        patched.latitude = Some(patch.latitude);
        patched.longitude = Some(patch.longitude);
        patched
      }
      None => event.clone(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::backend::types::EventStatus;
  use chrono::{TimeZone, Utc};

  fn event(id: &str, lat: f64, lon: f64) -> PublishedEvent {
    PublishedEvent {
      id: id.to_string(),
      title: format!("Jam {}", id),
      location: String::new(),
      latitude: Some(lat),
      longitude: Some(lon),
      event_date: Utc.with_ymd_and_hms(2026, 9, 18, 10, 0, 0).unwrap(),
      status: EventStatus::Published,
      cover_image: None,
      sdg_focus: None,
      host_id: None,
    }
  }

  fn patch(id: &str, lat: f64, lon: f64) -> CoordinatePatch {
    CoordinatePatch {
      id: id.to_string(),
      latitude: lat,
      longitude: lon,
    }
  }

  #[test]
  fn test_matching_records_patched_others_untouched() {
    let events = vec![event("a", 1.0, 1.0), event("b", 2.0, 2.0)];
    let patches = vec![patch("a", 9.0, 9.0), patch("c", 5.0, 5.0)];

    let result = apply_local_patch(&events, &patches);

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].valid_coordinates(), Some((9.0, 9.0)));
    assert_eq!(result[1].valid_coordinates(), Some((2.0, 2.0)));
  }

  #[test]
  fn test_input_not_mutated() {
    let events = vec![event("a", 1.0, 1.0)];
    let patches = vec![patch("a", 9.0, 9.0)];

    let _ = apply_local_patch(&events, &patches);

    assert_eq!(events[0].valid_coordinates(), Some((1.0, 1.0)));
  }

  #[test]
  fn test_patch_fills_missing_coordinates() {
    let mut missing = event("a", 0.0, 0.0);
    missing.latitude = None;
    missing.longitude = None;

    let result = apply_local_patch(&[missing], &[patch("a", 52.37, 4.89)]);

    assert_eq!(result[0].valid_coordinates(), Some((52.37, 4.89)));
  }

  #[test]
  fn test_empty_patch_list_is_identity() {
    let events = vec![event("a", 1.0, 1.0), event("b", 2.0, 2.0)];
    let result = apply_local_patch(&events, &[]);
    assert_eq!(result, events);
  }
}
