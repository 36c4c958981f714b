//! Shared caching for the published-events collection.
//!
//! This module provides the one cache every consumer goes through:
//! - A single snapshot with a freshness window and refetch-on-staleness
//! - Coalescing of concurrent fetches into one backend call
//! - Rate-limit awareness: failed fetches keep the old snapshot and open
//!   a retry gate with a UI-facing countdown
//! - Local coordinate patching for writes that are already persisted

mod patch;
mod shared;

pub use patch::apply_local_patch;
pub use shared::{CacheView, FetchResult, SharedEventCache, DEFAULT_MAX_AGE};
