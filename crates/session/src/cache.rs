//! In-memory TTL cache of profile records with request coalescing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use eduforge_auth::ProfileRecord;
use eduforge_core::PrincipalId;

use crate::clock::Clock;
use crate::error::StoreError;
use crate::ports::ProfileStore;
use crate::timeout::{Raced, race};

/// Result of one backing-store lookup, shared by every coalesced caller.
pub type FetchOutcome = Result<Option<ProfileRecord>, StoreError>;

/// Handle to an in-flight lookup. Cloning it does not start another lookup.
pub type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// A cached profile and when it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub record: ProfileRecord,
    pub fetched_at: DateTime<Utc>,
}

struct InFlight {
    ticket: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<PrincipalId, CacheEntry>,
    in_flight: HashMap<PrincipalId, InFlight>,
    next_ticket: u64,
}

/// Profile cache shared by the resolvers.
///
/// - Entries older than the TTL are never returned; they are dropped on read.
/// - At most one lookup per principal id is in flight; [`ProfileCache::load`]
///   hands every caller the same [`SharedFetch`].
/// - Lookups run on their own task, so a caller that gives up at its deadline
///   does not cancel the lookup; a late result still warms the cache.
/// - Each store call is bounded by the `limit` given to [`ProfileCache::load`].
///   A call that exceeds it completes as [`StoreError::Unavailable`] and frees
///   the in-flight slot, so the next caller starts a fresh lookup.
/// - A lookup that was in flight when its id was invalidated (or the cache was
///   cleared) never writes its result back.
///
/// The lock is never held across an `.await`.
#[derive(Clone)]
pub struct ProfileCache {
    state: Arc<Mutex<CacheState>>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
}

impl core::fmt::Debug for ProfileCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state();
        f.debug_struct("ProfileCache")
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ProfileCache {
    /// Default time-to-live of an entry.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // Every critical section leaves the maps consistent, so a poisoned lock
        // still guards valid state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A fresh entry and its age; stale entries are evicted and reported as misses.
    pub fn get(&self, id: PrincipalId) -> Option<(ProfileRecord, Duration)> {
        let now = self.clock.now();
        let mut state = self.state();

        let age = now.signed_duration_since(state.entries.get(&id)?.fetched_at);
        if age >= self.ttl {
            state.entries.remove(&id);
            tracing::debug!(principal_id = %id, age_secs = age.num_seconds(), "profile cache entry expired");
            return None;
        }

        let entry = state.entries.get(&id)?;
        Some((entry.record.clone(), age.to_std().unwrap_or_default()))
    }

    pub fn put(&self, id: PrincipalId, record: ProfileRecord) {
        let fetched_at = self.clock.now();
        self.state().entries.insert(id, CacheEntry { record, fetched_at });
    }

    /// Drop the entry for `id` and detach any lookup in flight for it.
    pub fn invalidate(&self, id: PrincipalId) {
        let mut state = self.state();
        state.entries.remove(&id);
        state.in_flight.remove(&id);
    }

    /// Drop every entry and detach every in-flight lookup.
    pub fn clear_all(&self) {
        let mut state = self.state();
        let dropped = state.entries.len();
        state.entries.clear();
        state.in_flight.clear();
        tracing::debug!(dropped, "profile cache cleared");
    }

    /// Number of entries that are still fresh.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.state()
            .entries
            .values()
            .filter(|e| now.signed_duration_since(e.fetched_at) < self.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups currently in flight.
    pub fn in_flight(&self) -> usize {
        self.state().in_flight.len()
    }

    /// Join the in-flight lookup for `id`, or start one against `store` bounded
    /// by `limit`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(&self, id: PrincipalId, store: Arc<dyn ProfileStore>, limit: Duration) -> SharedFetch {
        let mut state = self.state();
        if let Some(in_flight) = state.in_flight.get(&id) {
            tracing::debug!(principal_id = %id, "joining in-flight profile lookup");
            return in_flight.fetch.clone();
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;

        let cache = self.clone();
        let task = tokio::spawn(async move {
            let outcome = match race(store.get_profile(id), limit).await {
                Raced::Value(outcome) => outcome,
                Raced::TimedOut => {
                    tracing::warn!(principal_id = %id, limit_ms = limit.as_millis() as u64, "profile store call abandoned");
                    Err(StoreError::Unavailable(format!(
                        "no answer within {} ms",
                        limit.as_millis()
                    )))
                }
            };
            cache.complete(id, ticket, &outcome);
            outcome
        });

        let fetch = async move {
            task.await.unwrap_or_else(|err| {
                Err(StoreError::Backend(format!("profile lookup task failed: {err}")))
            })
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            id,
            InFlight {
                ticket,
                fetch: fetch.clone(),
            },
        );
        fetch
    }

    fn complete(&self, id: PrincipalId, ticket: u64, outcome: &FetchOutcome) {
        let fetched_at = self.clock.now();
        let mut state = self.state();

        // Only the lookup still registered for `id` may write back.
        if state.in_flight.get(&id).is_none_or(|f| f.ticket != ticket) {
            tracing::debug!(principal_id = %id, "discarding detached profile lookup result");
            return;
        }
        state.in_flight.remove(&id);

        if let Ok(Some(record)) = outcome {
            state.entries.insert(
                id,
                CacheEntry {
                    record: record.clone(),
                    fetched_at,
                },
            );
        }
    }
}
