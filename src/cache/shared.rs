//! Process-wide snapshot cache for the published-events collection.
//!
//! Several parts of the application (map, continent overview, event list)
//! want the same collection at the same time. This cache keeps one snapshot
//! and one in-flight fetch: callers that arrive while a fetch is running
//! join it instead of issuing their own, and all of them observe the same
//! result or the same error.
//!
//! # Example
//!
//! ```ignore
//! let cache = SharedEventCache::for_client(client);
//!
//! // Fresh snapshot served without touching the network
//! let events = cache.get().await?;
//!
//! // Synchronous read for rendering
//! let view = cache.view();
//! if view.retry_in_secs > 0 {
//!     println!("rate limited, retrying in {}s", view.retry_in_secs);
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use chrono::Utc;
use futures::future::{FutureExt, Shared};
use tracing::debug;

use crate::backend::types::{CoordinatePatch, EventStatus, PublishedEvent};
use crate::backend::BackendClient;
use crate::error::BackendError;

use super::patch::apply_local_patch;

/// Freshness window used when the caller does not supply one.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60);

/// Retry gate applied after a failed fetch with no server reset hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(15);

/// Outcome of a (possibly joined) fetch. Both sides are behind `Arc` so
/// every waiter on a coalesced fetch can receive the same value.
pub type FetchResult = Result<Arc<Vec<PublishedEvent>>, Arc<BackendError>>;

type BoxFetch = Pin<Box<dyn Future<Output = Result<Vec<PublishedEvent>, BackendError>> + Send>>;
type FetcherFn = Box<dyn Fn() -> BoxFetch + Send + Sync>;
type SharedFetch = Shared<Pin<Box<dyn Future<Output = FetchResult> + Send>>>;

struct InFlight {
  /// Identifies which fetch owns the slot, so a completion that raced an
  /// `invalidate` cannot clear a newer fetch's handle.
  seq: u64,
  fut: SharedFetch,
}

#[derive(Default)]
struct CacheState {
  snapshot: Option<Arc<Vec<PublishedEvent>>>,
  fetched_at: Option<Instant>,
  in_flight: Option<InFlight>,
  last_error: Option<Arc<BackendError>>,
  retry_at: Option<Instant>,
  seq: u64,
}

/// Snapshot of the cache for rendering, mirroring what each view needs:
/// the data, whether a fetch is running, and the retry countdown.
#[derive(Debug, Clone)]
pub struct CacheView {
  /// Last good snapshot; empty if nothing has been fetched yet
  pub events: Arc<Vec<PublishedEvent>>,
  pub loading: bool,
  pub error: Option<Arc<BackendError>>,
  pub retry_at: Option<Instant>,
  pub retry_in_secs: u64,
}

/// Shared, coalescing cache of the published-events collection.
///
/// Cloning is cheap and every clone operates on the same state; construct
/// one per process and hand clones to consumers.
#[derive(Clone)]
pub struct SharedEventCache {
  state: Arc<Mutex<CacheState>>,
  fetcher: Arc<FetcherFn>,
  max_age: Duration,
}

impl SharedEventCache {
  /// Create a cache over an arbitrary fetcher. The fetcher is called once
  /// per actual network fetch, however many consumers are waiting.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<PublishedEvent>, BackendError>> + Send + 'static,
  {
    Self {
      state: Arc::new(Mutex::new(CacheState::default())),
      fetcher: Arc::new(Box::new(move || Box::pin(fetcher()))),
      max_age: DEFAULT_MAX_AGE,
    }
  }

  /// Create a cache backed by the backend client's listing endpoint.
  pub fn for_client(client: BackendClient) -> Self {
    Self::new(move || {
      let client = client.clone();
      async move { client.list_published().await }
    })
  }

  /// Set the default freshness window.
  pub fn with_max_age(mut self, max_age: Duration) -> Self {
    self.max_age = max_age;
    self
  }

  /// Get the collection, fetching only when the snapshot is stale or
  /// missing. Equivalent to `get_within` with the cache's default window.
  pub async fn get(&self) -> FetchResult {
    self.get_within(self.max_age).await
  }

  /// Get the collection with a caller-supplied freshness window.
  ///
  /// A fresh snapshot is returned without any network access. A stale or
  /// missing one triggers a fetch (joining the in-flight one if any) and
  /// the caller waits for it: staleness shows as loading, not as stale
  /// data being revalidated in the background.
  pub async fn get_within(&self, max_age: Duration) -> FetchResult {
    if let Some(snapshot) = self.fresh_snapshot(max_age) {
      return Ok(snapshot);
    }
    self.fetch_shared().await
  }

  /// Manual refetch. With `force` unset this is a no-op while the retry
  /// gate from a previous failure is still closed; callers are expected to
  /// show the countdown instead of hammering the backend.
  pub async fn refresh(&self, force: bool) -> Result<(), Arc<BackendError>> {
    if !force {
      let state = self.lock_state();
      if state.retry_at.is_some_and(|at| Instant::now() < at) {
        debug!("refresh skipped, retry gate still closed");
        return Ok(());
      }
    }
    self.fetch_shared().await.map(|_| ())
  }

  /// Seconds until a retry is allowed, clamped at zero. Display only.
  pub fn retry_countdown_secs(&self) -> u64 {
    countdown(self.lock_state().retry_at)
  }

  /// Drop everything so the next access refetches. Writers that mutate the
  /// underlying collection must call this or consumers keep seeing stale
  /// data. An already-running fetch is not cancelled and still lands its
  /// result (last writer wins).
  pub fn invalidate(&self) {
    let mut state = self.lock_state();
    state.snapshot = None;
    state.fetched_at = None;
    state.in_flight = None;
    state.last_error = None;
    state.retry_at = None;
  }

  /// Overwrite coordinates in the current snapshot without refetching.
  /// Used after a coordinate-only write that is already persisted, so a
  /// round trip just to re-read the same values is skipped.
  pub fn apply_patches(&self, patches: &[CoordinatePatch]) {
    let mut state = self.lock_state();
    if let Some(snapshot) = &state.snapshot {
      state.snapshot = Some(Arc::new(apply_local_patch(snapshot, patches)));
    }
  }

  /// Synchronous read of the consumer-facing surface.
  pub fn view(&self) -> CacheView {
    let state = self.lock_state();
    CacheView {
      events: state.snapshot.clone().unwrap_or_default(),
      loading: state.in_flight.is_some(),
      error: state.last_error.clone(),
      retry_at: state.retry_at,
      retry_in_secs: countdown(state.retry_at),
    }
  }

  fn fresh_snapshot(&self, max_age: Duration) -> Option<Arc<Vec<PublishedEvent>>> {
    let state = self.lock_state();
    let fetched_at = state.fetched_at?;
    if fetched_at.elapsed() < max_age {
      state.snapshot.clone()
    } else {
      None
    }
  }

  /// Join the in-flight fetch if there is one, otherwise start a new one.
  ///
  /// The actual fetch runs in a spawned task: a caller that goes away
  /// before it resolves drops its handle, not the fetch, so every other
  /// waiter still gets the result.
  fn fetch_shared(&self) -> SharedFetch {
    let mut state = self.lock_state();
    if let Some(in_flight) = &state.in_flight {
      debug!("joining in-flight fetch");
      return in_flight.fut.clone();
    }

    state.seq += 1;
    let seq = state.seq;

    let fetch = (self.fetcher)();
    let task_state = Arc::clone(&self.state);
    let task = tokio::spawn(async move {
      let result = fetch.await;
      let mut state = lock(&task_state);
      let outcome = match result {
        Ok(rows) => {
          let events: Vec<PublishedEvent> = rows
            .into_iter()
            .filter(|event| event.status != EventStatus::Draft)
            .collect();
          debug!(rows = events.len(), "snapshot updated");
          let snapshot = Arc::new(events);
          state.snapshot = Some(Arc::clone(&snapshot));
          state.fetched_at = Some(Instant::now());
          state.last_error = None;
          state.retry_at = None;
          Ok(snapshot)
        }
        Err(err) => {
          let retry_at = retry_gate(&err);
          let err = Arc::new(err);
          debug!(error = %err, "fetch failed, previous snapshot retained");
          state.last_error = Some(Arc::clone(&err));
          state.retry_at = Some(retry_at);
          Err(err)
        }
      };
      if state.in_flight.as_ref().is_some_and(|f| f.seq == seq) {
        state.in_flight = None;
      }
      outcome
    });

    let join_state = Arc::clone(&self.state);
    let fut: SharedFetch = async move {
      match task.await {
        Ok(outcome) => outcome,
        Err(_) => {
          // Fetch task panicked or was torn down with the runtime; free
          // the slot so the next access can try again.
          let mut state = lock(&join_state);
          if state.in_flight.as_ref().is_some_and(|f| f.seq == seq) {
            state.in_flight = None;
          }
          Err(Arc::new(BackendError::Aborted))
        }
      }
    }
    .boxed()
    .shared();

    state.in_flight = Some(InFlight {
      seq,
      fut: fut.clone(),
    });
    fut
  }

  fn lock_state(&self) -> MutexGuard<'_, CacheState> {
    lock(&self.state)
  }
}

// All critical sections are short and free of panicking calls; if one is
// poisoned anyway, the state is still coherent, so recover it.
fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
  state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn countdown(retry_at: Option<Instant>) -> u64 {
  match retry_at {
    Some(at) => {
      let remaining = at.saturating_duration_since(Instant::now());
      remaining.as_secs_f64().ceil() as u64
    }
    None => 0,
  }
}

/// Earliest time a retry makes sense after `err`: the server's reset hint
/// when it gave one, otherwise a fixed cool-off.
fn retry_gate(err: &BackendError) -> Instant {
  let wait = err
    .reset_at()
    .map(|reset| (reset - Utc::now()).to_std().unwrap_or_default())
    .unwrap_or(DEFAULT_RETRY_AFTER);
  Instant::now() + wait
}

impl std::fmt::Debug for SharedEventCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.lock_state();
    f.debug_struct("SharedEventCache")
      .field("has_snapshot", &state.snapshot.is_some())
      .field("fetched_at", &state.fetched_at)
      .field("loading", &state.in_flight.is_some())
      .field("retry_at", &state.retry_at)
      .field("max_age", &self.max_age)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn event(id: &str, status: EventStatus, day: u32) -> PublishedEvent {
    PublishedEvent {
      id: id.to_string(),
      title: format!("Jam {}", id),
      location: "Somewhere".to_string(),
      latitude: None,
      longitude: None,
      event_date: Utc.with_ymd_and_hms(2026, 9, day, 10, 0, 0).unwrap(),
      status,
      cover_image: None,
      sdg_focus: None,
      host_id: None,
    }
  }

  fn sample_rows() -> Vec<PublishedEvent> {
    vec![
      event("a", EventStatus::Published, 1),
      event("b", EventStatus::Draft, 2),
      event("c", EventStatus::Ongoing, 3),
      event("d", EventStatus::Completed, 4),
    ]
  }

  /// Cache whose fetcher counts calls and takes a little simulated time.
  fn counting_cache(rows: Vec<PublishedEvent>) -> (SharedEventCache, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let cache = SharedEventCache::new(move || {
      let calls = calls_clone.clone();
      let rows = rows.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(rows)
      }
    });
    (cache, calls)
  }

  /// Cache that succeeds on the first call and is rate limited afterwards.
  fn flaky_cache() -> (SharedEventCache, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let cache = SharedEventCache::new(move || {
      let calls = calls_clone.clone();
      async move {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
          Ok(sample_rows())
        } else {
          Err(BackendError::RateLimited { reset_at: None })
        }
      }
    });
    (cache, calls)
  }

  async fn settle() {
    for _ in 0..4 {
      tokio::task::yield_now().await;
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_gets_coalesce() {
    let (cache, calls) = counting_cache(sample_rows());

    let waiters: Vec<_> = (0..5)
      .map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get().await })
      })
      .collect();

    let mut results = Vec::new();
    for waiter in waiters {
      results.push(waiter.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in &results {
      assert_eq!(result.as_slice(), results[0].as_slice());
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_snapshot_served_without_fetch() {
    let (cache, calls) = counting_cache(sample_rows());

    cache.get().await.unwrap();
    let again = cache.get().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(again.len(), 3);
    assert!(!cache.view().loading);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_snapshot_triggers_refetch() {
    let (cache, calls) = counting_cache(sample_rows());
    let cache = cache.with_max_age(Duration::from_secs(30));

    cache.get().await.unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;
    cache.get().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_drafts_excluded_in_order() {
    let (cache, _) = counting_cache(sample_rows());

    let events = cache.get().await.unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();

    assert_eq!(ids, vec!["a", "c", "d"]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failure_preserves_previous_snapshot() {
    let (cache, calls) = flaky_cache();

    cache.get().await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;

    let err = cache.get().await.unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let view = cache.view();
    assert_eq!(view.events.len(), 3);
    assert!(view.error.is_some());
    assert_eq!(view.retry_in_secs, 15);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refresh_respects_retry_gate() {
    let (cache, calls) = flaky_cache();

    cache.get().await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    let _ = cache.get().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Gate closed: no-op
    cache.refresh(false).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // Forced: fetches anyway
    let _ = cache.refresh(true).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Gate expired: fetches again
    tokio::time::advance(Duration::from_secs(16)).await;
    let _ = cache.refresh(false).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_refresh_without_gate_fetches_even_when_fresh() {
    let (cache, calls) = counting_cache(sample_rows());

    cache.get().await.unwrap();
    cache.refresh(false).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_forces_refetch() {
    let (cache, calls) = counting_cache(sample_rows());

    cache.get().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate();
    assert!(cache.view().events.is_empty());

    cache.get().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_abandoned_waiter_does_not_cancel_fetch() {
    let (cache, calls) = counting_cache(sample_rows());

    let waiter = {
      let cache = cache.clone();
      tokio::spawn(async move { cache.get().await })
    };
    settle().await;
    assert!(cache.view().loading);
    waiter.abort();

    let events = cache.get().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetch_completing_after_invalidate_still_lands() {
    let (cache, calls) = counting_cache(sample_rows());

    let waiter = {
      let cache = cache.clone();
      tokio::spawn(async move { cache.get().await })
    };
    settle().await;
    assert!(cache.view().loading);

    cache.invalidate();
    assert!(!cache.view().loading);

    // Last writer wins: the in-flight fetch still populates the snapshot
    let result = waiter.await.unwrap().unwrap();
    assert_eq!(result.len(), 3);
    assert_eq!(cache.view().events.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_apply_patches_updates_snapshot_without_fetch() {
    let (cache, calls) = counting_cache(sample_rows());
    cache.get().await.unwrap();

    cache.apply_patches(&[CoordinatePatch {
      id: "a".to_string(),
      latitude: 48.85,
      longitude: 2.35,
    }]);

    let view = cache.view();
    let patched = view.events.iter().find(|e| e.id == "a").unwrap();
    assert_eq!(patched.valid_coordinates(), Some((48.85, 2.35)));

    // Still fresh: no extra fetch happened or is needed
    cache.get().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_reset_hint_drives_countdown() {
    let cache = SharedEventCache::new(|| async {
      Err::<Vec<PublishedEvent>, _>(BackendError::RateLimited {
        reset_at: Some(Utc::now() + chrono::Duration::seconds(30)),
      })
    });

    let err = cache.get().await.unwrap_err();
    assert!(err.is_rate_limited());

    let secs = cache.retry_countdown_secs();
    assert!((29..=30).contains(&secs), "unexpected countdown {}", secs);
  }
}
