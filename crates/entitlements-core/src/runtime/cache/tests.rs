// crates/entitlements-core/src/runtime/cache/tests.rs
// ============================================================================
// Module: Feature-Status Cache Unit Tests
// Description: Unit tests for hit, fail-closed, TTL, and single-flight rules.
// Purpose: Validate cache policy with a scripted source on a paused clock.
// Dependencies: entitlements-core, tokio
// ============================================================================

//! ## Overview
//! Exercises the cache against a scripted upstream. Tests run on tokio's
//! paused clock so TTL expiry and slow upstreams are deterministic.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions."
)]

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::task::JoinSet;

use super::*;
use crate::core::Feature;
use crate::interfaces::UpstreamError;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Upstream double returning a fixed outcome after an optional delay.
struct ScriptedSource {
    calls: AtomicUsize,
    delay: Duration,
    outcome: Mutex<Result<FeatureSnapshot, UpstreamError>>,
}

impl ScriptedSource {
    fn new(outcome: Result<FeatureSnapshot, UpstreamError>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            outcome: Mutex::new(outcome),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_outcome(&self, outcome: Result<FeatureSnapshot, UpstreamError>) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

#[async_trait]
impl FeatureStatusSource for ScriptedSource {
    async fn fetch(&self, _org_id: &str) -> Result<FeatureSnapshot, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.lock().unwrap().clone()
    }
}

fn snapshot() -> FeatureSnapshot {
    FeatureSnapshot {
        features: vec![Feature {
            name: "ansible".to_string(),
            is_eval: true,
            entitled: true,
        }],
    }
}

fn config() -> FeatureStatusCacheConfig {
    FeatureStatusCacheConfig {
        ttl: Duration::from_secs(60),
        max_entries: 16,
    }
}

fn cache_over(source: &Arc<ScriptedSource>, config: FeatureStatusCacheConfig) -> FeatureStatusCache {
    let source: Arc<dyn FeatureStatusSource> = source.clone();
    FeatureStatusCache::new(source, config)
}

fn flight_count(cache: &FeatureStatusCache) -> usize {
    cache.lock_state().flights.len()
}

// ============================================================================
// SECTION: Hit and Miss
// ============================================================================

#[tokio::test(start_paused = true)]
async fn success_is_cached_within_ttl() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::ZERO);
    let cache = cache_over(&source, config());

    let first = cache.get("org-1", false).await;
    assert!(!first.cache_hit);
    assert_eq!(first.status_code, 200);
    assert_eq!(*first.snapshot, snapshot());

    let second = cache.get("org-1", false).await;
    assert!(second.cache_hit);
    assert_eq!(second.snapshot, first.snapshot);
    assert_eq!(source.calls(), 1);
    assert_eq!(flight_count(&cache), 0);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::ZERO);
    let cache = cache_over(&source, config());

    cache.get("org-1", false).await;
    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.get("org-1", false).await.cache_hit);
    tokio::time::advance(Duration::from_secs(2)).await;
    let refreshed = cache.get("org-1", false).await;
    assert!(!refreshed.cache_hit);
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_fresh_bypasses_a_valid_entry() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::ZERO);
    let cache = cache_over(&source, config());

    cache.get("org-1", false).await;
    let forced = cache.get("org-1", true).await;
    assert!(!forced.cache_hit);
    assert_eq!(source.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn orgs_are_cached_independently() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::ZERO);
    let cache = cache_over(&source, config());

    cache.get("org-1", false).await;
    let other = cache.get("org-2", false).await;
    assert!(!other.cache_hit);
    assert_eq!(cache.len(), 2);
}

// ============================================================================
// SECTION: Fail-Closed
// ============================================================================

#[tokio::test(start_paused = true)]
async fn upstream_error_status_is_cached_as_fail_closed_marker() {
    let source = ScriptedSource::new(
        Err(UpstreamError::Client {
            service: "feature-status",
            status: 500,
            message: "boom".to_string(),
        }),
        Duration::ZERO,
    );
    let cache = cache_over(&source, config());

    let first = cache.get("org-1", false).await;
    assert!(!first.cache_hit);
    assert_eq!(first.status_code, 500);
    assert!(first.is_degraded());
    assert!(first.snapshot.features.is_empty());

    let second = cache.get("org-1", false).await;
    assert!(second.cache_hit);
    assert_eq!(second.status_code, 500);
    assert_eq!(second.snapshot, first.snapshot);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn failures_without_error_status_record_503() {
    let source = ScriptedSource::new(
        Err(UpstreamError::Timeout {
            service: "feature-status",
        }),
        Duration::ZERO,
    );
    let cache = cache_over(&source, config());
    assert_eq!(cache.get("org-1", false).await.status_code, 503);

    source.set_outcome(Err(UpstreamError::Client {
        service: "feature-status",
        status: 302,
        message: "redirect".to_string(),
    }));
    assert_eq!(cache.get("org-2", false).await.status_code, 503);
}

#[tokio::test(start_paused = true)]
async fn force_fresh_after_failure_can_recover() {
    let source = ScriptedSource::new(
        Err(UpstreamError::Transport {
            service: "feature-status",
            message: "refused".to_string(),
        }),
        Duration::ZERO,
    );
    let cache = cache_over(&source, config());
    assert!(cache.get("org-1", false).await.is_degraded());

    source.set_outcome(Ok(snapshot()));
    let recovered = cache.get("org-1", true).await;
    assert!(!recovered.is_degraded());
    assert!(cache.get("org-1", false).await.cache_hit);
}

// ============================================================================
// SECTION: Single-Flight
// ============================================================================

#[tokio::test(start_paused = true)]
async fn concurrent_misses_coalesce_into_one_fetch() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::from_millis(100));
    let cache = Arc::new(cache_over(&source, config()));

    let mut tasks = JoinSet::new();
    for _ in 0 .. 8 {
        let cache = Arc::clone(&cache);
        tasks.spawn(async move { cache.get("org-1", false).await });
    }
    let mut results = Vec::new();
    while let Some(result) = tasks.join_next().await {
        results.push(result.unwrap());
    }

    assert_eq!(source.calls(), 1);
    assert_eq!(results.iter().filter(|lookup| !lookup.cache_hit).count(), 1);
    assert!(results.iter().all(|lookup| *lookup.snapshot == snapshot()));
    assert_eq!(flight_count(&cache), 0);
}

#[tokio::test(start_paused = true)]
async fn concurrent_force_fresh_requests_share_one_fetch() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::from_millis(100));
    let cache = Arc::new(cache_over(&source, config()));

    let mut tasks = JoinSet::new();
    for _ in 0 .. 4 {
        let cache = Arc::clone(&cache);
        tasks.spawn(async move { cache.get("org-1", true).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_leader_hands_over_to_waiter() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::from_millis(100));
    let cache = Arc::new(cache_over(&source, config()));

    let leader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("org-1", false).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let waiter = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("org-1", false).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(source.calls(), 1);

    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    let lookup = waiter.await.unwrap();
    assert!(!lookup.cache_hit);
    assert_eq!(*lookup.snapshot, snapshot());
    assert_eq!(source.calls(), 2);
    assert_eq!(flight_count(&cache), 0);
}

#[tokio::test(start_paused = true)]
async fn fully_cancelled_fetch_writes_nothing() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::from_millis(100));
    let cache = Arc::new(cache_over(&source, config()));

    let leader = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("org-1", false).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    leader.abort();
    assert!(leader.await.unwrap_err().is_cancelled());

    assert!(cache.is_empty());
    assert_eq!(flight_count(&cache), 0);
}

// ============================================================================
// SECTION: Capacity
// ============================================================================

#[tokio::test(start_paused = true)]
async fn oldest_entry_is_evicted_at_capacity() {
    let source = ScriptedSource::new(Ok(snapshot()), Duration::ZERO);
    let cache = cache_over(
        &source,
        FeatureStatusCacheConfig {
            ttl: Duration::from_secs(60),
            max_entries: 2,
        },
    );

    cache.get("org-1", false).await;
    cache.get("org-2", false).await;
    cache.get("org-3", false).await;
    assert_eq!(cache.len(), 2);
    assert!(cache.get("org-3", false).await.cache_hit);
    assert!(!cache.get("org-1", false).await.cache_hit);
    assert_eq!(source.calls(), 4);
}
