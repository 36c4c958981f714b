//! Event operations with caching wired in.
//!
//! This wraps the backend client and the shared cache so callers cannot
//! forget the coherence rules: reads go through the cache, writes that
//! change event content invalidate it, and coordinate-only fixes patch the
//! snapshot locally instead of forcing a refetch.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::backend::types::{CoordinatePatch, EventInput, PublishedEvent};
use crate::backend::BackendClient;
use crate::cache::SharedEventCache;
use crate::error::BackendError;

#[derive(Clone)]
pub struct EventsService {
  client: BackendClient,
  cache: SharedEventCache,
}

impl EventsService {
  pub fn new(client: BackendClient, max_age: Duration) -> Self {
    let cache = SharedEventCache::for_client(client.clone()).with_max_age(max_age);
    Self { client, cache }
  }

  /// The shared cache, for consumers that render from it directly.
  pub fn cache(&self) -> &SharedEventCache {
    &self.cache
  }

  /// Published events, served from cache when fresh. A caller-supplied
  /// freshness window overrides the cache default.
  pub async fn list_events(
    &self,
    max_age: Option<Duration>,
  ) -> Result<Arc<Vec<PublishedEvent>>, Arc<BackendError>> {
    match max_age {
      Some(age) => self.cache.get_within(age).await,
      None => self.cache.get().await,
    }
  }

  /// Manual refetch; gated by the rate-limit countdown unless forced.
  pub async fn refresh(&self, force: bool) -> Result<(), Arc<BackendError>> {
    self.cache.refresh(force).await
  }

  /// Create an event and invalidate the cache so the next read sees it.
  pub async fn create_event(&self, input: &EventInput) -> Result<PublishedEvent, BackendError> {
    let created = self.client.create_event(input).await?;
    info!(id = %created.id, "event created");
    self.cache.invalidate();
    Ok(created)
  }

  /// Update an event and invalidate the cache.
  pub async fn update_event(
    &self,
    id: &str,
    input: &EventInput,
  ) -> Result<PublishedEvent, BackendError> {
    let updated = self.client.update_event(id, input).await?;
    info!(id = %updated.id, "event updated");
    self.cache.invalidate();
    Ok(updated)
  }

  /// Persist coordinate corrections and apply them to the local snapshot.
  ///
  /// No invalidation here: the write is coordinate-only and the same values
  /// are patched in locally, so a refetch would only re-read what we
  /// already have.
  pub async fn fix_coordinates(&self, patches: &[CoordinatePatch]) -> Result<(), BackendError> {
    if patches.is_empty() {
      return Ok(());
    }
    self.client.upsert_coordinates(patches).await?;
    self.cache.apply_patches(patches);
    info!(count = patches.len(), "coordinates corrected");
    Ok(())
  }
}
