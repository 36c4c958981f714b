//! Continent resolution for grouping events in the overview.
//!
//! Event locations are free text and coordinates are sometimes missing or
//! wrong, so this is heuristic on purpose: coarse bounding boxes over the
//! coordinates first, then keyword matching on the location string.

use std::fmt;

use crate::backend::types::PublishedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Continent {
  Africa,
  Antarctica,
  Asia,
  Europe,
  NorthAmerica,
  Oceania,
  SouthAmerica,
}

impl fmt::Display for Continent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Continent::Africa => "Africa",
      Continent::Antarctica => "Antarctica",
      Continent::Asia => "Asia",
      Continent::Europe => "Europe",
      Continent::NorthAmerica => "North America",
      Continent::Oceania => "Oceania",
      Continent::SouthAmerica => "South America",
    };
    f.write_str(name)
  }
}

/// Coarse bounding boxes, checked in order. Good enough for grouping a
/// few hundred events; not a reverse geocoder.
pub fn continent_from_coordinates(lat: f64, lon: f64) -> Option<Continent> {
  if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
    return None;
  }

  if lat <= -60.0 {
    return Some(Continent::Antarctica);
  }
  if (-50.0..0.0).contains(&lat) && (110.0..=180.0).contains(&lon) {
    return Some(Continent::Oceania);
  }
  if (36.0..=80.0).contains(&lat) && (-25.0..45.0).contains(&lon) {
    return Some(Continent::Europe);
  }
  if (-35.0..36.0).contains(&lat) && (-18.0..52.0).contains(&lon) {
    return Some(Continent::Africa);
  }
  if (-11.0..=80.0).contains(&lat) && (45.0..=180.0).contains(&lon) {
    return Some(Continent::Asia);
  }
  if (7.0..=84.0).contains(&lat) && (-170.0..=-50.0).contains(&lon) {
    return Some(Continent::NorthAmerica);
  }
  if (-56.0..7.0).contains(&lat) && (-82.0..=-34.0).contains(&lon) {
    return Some(Continent::SouthAmerica);
  }

  None
}

/// Keyword fallback for events without usable coordinates.
pub fn continent_from_text(location: &str) -> Option<Continent> {
  let location = location.to_lowercase();
  KEYWORDS
    .iter()
    .find(|(keyword, _)| location.contains(keyword))
    .map(|(_, continent)| *continent)
}

/// Best-effort continent for an event: valid coordinates win, then the
/// location string.
pub fn continent_for(event: &PublishedEvent) -> Option<Continent> {
  if let Some((lat, lon)) = event.valid_coordinates() {
    if let Some(continent) = continent_from_coordinates(lat, lon) {
      return Some(continent);
    }
  }
  continent_from_text(&event.location)
}

/// Country and region names that show up in jam locations. Extended as
/// odd entries appear in the data, not meant to be exhaustive.
const KEYWORDS: &[(&str, Continent)] = &[
  ("germany", Continent::Europe),
  ("netherlands", Continent::Europe),
  ("france", Continent::Europe),
  ("spain", Continent::Europe),
  ("italy", Continent::Europe),
  ("portugal", Continent::Europe),
  ("united kingdom", Continent::Europe),
  ("england", Continent::Europe),
  ("scotland", Continent::Europe),
  ("ireland", Continent::Europe),
  ("poland", Continent::Europe),
  ("sweden", Continent::Europe),
  ("finland", Continent::Europe),
  ("norway", Continent::Europe),
  ("denmark", Continent::Europe),
  ("switzerland", Continent::Europe),
  ("austria", Continent::Europe),
  ("belgium", Continent::Europe),
  ("greece", Continent::Europe),
  ("turkey", Continent::Europe),
  ("kenya", Continent::Africa),
  ("nigeria", Continent::Africa),
  ("ghana", Continent::Africa),
  ("egypt", Continent::Africa),
  ("south africa", Continent::Africa),
  ("morocco", Continent::Africa),
  ("ethiopia", Continent::Africa),
  ("uganda", Continent::Africa),
  ("tanzania", Continent::Africa),
  ("rwanda", Continent::Africa),
  ("china", Continent::Asia),
  ("japan", Continent::Asia),
  ("india", Continent::Asia),
  ("indonesia", Continent::Asia),
  ("singapore", Continent::Asia),
  ("korea", Continent::Asia),
  ("taiwan", Continent::Asia),
  ("thailand", Continent::Asia),
  ("vietnam", Continent::Asia),
  ("philippines", Continent::Asia),
  ("malaysia", Continent::Asia),
  ("pakistan", Continent::Asia),
  ("bangladesh", Continent::Asia),
  ("israel", Continent::Asia),
  ("lebanon", Continent::Asia),
  ("united states", Continent::NorthAmerica),
  ("usa", Continent::NorthAmerica),
  ("canada", Continent::NorthAmerica),
  ("mexico", Continent::NorthAmerica),
  ("guatemala", Continent::NorthAmerica),
  ("costa rica", Continent::NorthAmerica),
  ("brazil", Continent::SouthAmerica),
  ("brasil", Continent::SouthAmerica),
  ("argentina", Continent::SouthAmerica),
  ("chile", Continent::SouthAmerica),
  ("colombia", Continent::SouthAmerica),
  ("peru", Continent::SouthAmerica),
  ("ecuador", Continent::SouthAmerica),
  ("uruguay", Continent::SouthAmerica),
  ("australia", Continent::Oceania),
  ("new zealand", Continent::Oceania),
  ("fiji", Continent::Oceania),
];
