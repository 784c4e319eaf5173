// crates/entitlements-core/src/runtime/cache.rs
// ============================================================================
// Module: Feature-Status Cache
// Description: Single-flight TTL cache in front of the feature-status upstream.
// Purpose: Keep entitlement checks responsive while failing closed.
// Dependencies: crate::{core, interfaces}, tokio, tracing
// ============================================================================

//! ## Overview
//! The cache maps an org id to the most recent feature snapshot and the
//! status it was obtained with. Successful fetches are cached with status
//! `200`; failed fetches cache an empty snapshot with the observed status
//! (or `503`) so repeated failures do not hammer the upstream.
//!
//! Concurrent misses for the same org coalesce behind a per-org flight lock:
//! exactly one caller fetches while the others wait and then observe the
//! entry it wrote. If the fetching caller is cancelled the next waiter takes
//! over; if every caller is cancelled nothing is written. The shared map
//! lock is held only around map mutation, never across the upstream call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::core::FeatureSnapshot;
use crate::interfaces::FeatureStatusSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Status recorded for successful fetches.
const STATUS_OK: u16 = 200;
/// Status recorded when the upstream gave no usable error status.
const STATUS_UNAVAILABLE: u16 = 503;
/// Lowest status treated as a failure.
const FIRST_ERROR_STATUS: u16 = 400;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Cache sizing and expiry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureStatusCacheConfig {
    /// Maximum age of a served entry.
    pub ttl: Duration,
    /// Maximum number of cached orgs.
    pub max_entries: usize,
}

impl Default for FeatureStatusCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(1800),
            max_entries: 10_000,
        }
    }
}

/// Result of a cache lookup.
///
/// # Invariants
/// - `status_code >= 400` implies `snapshot` is empty (fail-closed marker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    /// Snapshot served to the caller.
    pub snapshot: Arc<FeatureSnapshot>,
    /// Status the snapshot was obtained with.
    pub status_code: u16,
    /// Served from an entry this caller did not fetch.
    pub cache_hit: bool,
}

impl CacheLookup {
    /// Returns true when the snapshot is a fail-closed marker.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.status_code >= FIRST_ERROR_STATUS
    }
}

/// Cached snapshot for one org.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached snapshot.
    snapshot: Arc<FeatureSnapshot>,
    /// Status the snapshot was obtained with.
    status_code: u16,
    /// Insertion time used for TTL checks.
    inserted_at: Instant,
    /// Monotonic insertion counter used to recognize coalesced results.
    generation: u64,
}

/// In-flight fetch coordination for one org.
#[derive(Debug)]
struct Flight {
    /// Held by the caller currently fetching.
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Callers holding a ticket for this flight.
    waiters: usize,
}

/// Shared cache state.
#[derive(Debug, Default)]
struct CacheState {
    /// Cached entries by org id.
    entries: HashMap<String, CacheEntry>,
    /// In-flight fetches by org id.
    flights: HashMap<String, Flight>,
    /// Last generation handed out.
    generation: u64,
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Single-flight, fail-closed TTL cache over a [`FeatureStatusSource`].
pub struct FeatureStatusCache {
    /// Upstream feature-status source.
    source: Arc<dyn FeatureStatusSource>,
    /// Sizing and expiry settings.
    config: FeatureStatusCacheConfig,
    /// Entries and flights behind a short-lived lock.
    state: Arc<Mutex<CacheState>>,
}

impl FeatureStatusCache {
    /// Creates an empty cache over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn FeatureStatusSource>, config: FeatureStatusCacheConfig) -> Self {
        Self {
            source,
            config,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Returns the snapshot for `org_id`, fetching it when needed.
    ///
    /// With `force_fresh` set, a cached entry is only served if it was
    /// written by a fetch that completed while this caller waited.
    pub async fn get(&self, org_id: &str, force_fresh: bool) -> CacheLookup {
        let seen_generation = {
            let state = self.lock_state();
            if !force_fresh && let Some(hit) = self.fresh_entry(&state, org_id, None) {
                debug!(org_id, "feature status cache hit");
                return hit;
            }
            state.generation
        };

        let ticket = self.join_flight(org_id);
        let _flight = ticket.lock.lock().await;

        {
            let state = self.lock_state();
            let not_older_than = force_fresh.then_some(seen_generation);
            if let Some(hit) = self.fresh_entry(&state, org_id, not_older_than) {
                debug!(org_id, "feature status served from coalesced fetch");
                return hit;
            }
        }

        debug!(org_id, force_fresh, "feature status cache miss");
        self.fetch_and_store(org_id).await
    }

    /// Returns the number of cached entries, including expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches from the upstream and records the outcome.
    async fn fetch_and_store(&self, org_id: &str) -> CacheLookup {
        let (snapshot, status_code) = match self.source.fetch(org_id).await {
            Ok(snapshot) => (snapshot, STATUS_OK),
            Err(err) => {
                let status = err
                    .observed_status()
                    .filter(|status| *status >= FIRST_ERROR_STATUS)
                    .unwrap_or(STATUS_UNAVAILABLE);
                warn!(
                    org_id,
                    status,
                    error = %err,
                    "feature status fetch failed; caching fail-closed marker"
                );
                (FeatureSnapshot::empty(), status)
            }
        };
        let snapshot = Arc::new(snapshot);
        let mut state = self.lock_state();
        state.generation = state.generation.wrapping_add(1);
        let entry = CacheEntry {
            snapshot: Arc::clone(&snapshot),
            status_code,
            inserted_at: Instant::now(),
            generation: state.generation,
        };
        self.insert_entry(&mut state, org_id, entry);
        CacheLookup {
            snapshot,
            status_code,
            cache_hit: false,
        }
    }

    /// Returns a hit when an unexpired entry exists for `org_id`.
    ///
    /// When `newer_than` is set, only entries written after that generation
    /// qualify.
    fn fresh_entry(
        &self,
        state: &CacheState,
        org_id: &str,
        newer_than: Option<u64>,
    ) -> Option<CacheLookup> {
        let entry = state.entries.get(org_id)?;
        if entry.inserted_at.elapsed() >= self.config.ttl {
            return None;
        }
        if newer_than.is_some_and(|generation| entry.generation <= generation) {
            return None;
        }
        Some(CacheLookup {
            snapshot: Arc::clone(&entry.snapshot),
            status_code: entry.status_code,
            cache_hit: true,
        })
    }

    /// Inserts an entry, evicting expired and then oldest entries at capacity.
    fn insert_entry(&self, state: &mut CacheState, org_id: &str, entry: CacheEntry) {
        let max_entries = self.config.max_entries.max(1);
        if !state.entries.contains_key(org_id) && state.entries.len() >= max_entries {
            let ttl = self.config.ttl;
            state.entries.retain(|_, cached| cached.inserted_at.elapsed() < ttl);
            while state.entries.len() >= max_entries {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.generation)
                    .map(|(key, _)| key.clone());
                let Some(oldest) = oldest else {
                    break;
                };
                state.entries.remove(&oldest);
            }
        }
        state.entries.insert(org_id.to_string(), entry);
    }

    /// Registers the caller as a waiter on the org's flight.
    fn join_flight(&self, org_id: &str) -> FlightTicket {
        let mut state = self.lock_state();
        let flight = state.flights.entry(org_id.to_string()).or_insert_with(|| Flight {
            lock: Arc::new(tokio::sync::Mutex::new(())),
            waiters: 0,
        });
        flight.waiters += 1;
        FlightTicket {
            lock: Arc::clone(&flight.lock),
            org_id: org_id.to_string(),
            state: Arc::clone(&self.state),
        }
    }

    /// Locks the shared state, recovering from poisoning.
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Flight Tickets
// ============================================================================

/// Membership in an org's flight; leaving removes the flight when empty.
struct FlightTicket {
    /// Flight lock shared with the other waiters.
    lock: Arc<tokio::sync::Mutex<()>>,
    /// Org the flight belongs to.
    org_id: String,
    /// Shared cache state.
    state: Arc<Mutex<CacheState>>,
}

impl Drop for FlightTicket {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let empty = state.flights.get_mut(&self.org_id).is_some_and(|flight| {
            flight.waiters = flight.waiters.saturating_sub(1);
            flight.waiters == 0
        });
        if empty {
            state.flights.remove(&self.org_id);
        }
    }
}

#[cfg(test)]
mod tests;
