// crates/entitlements-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Entitlement Evaluator
// Description: Bundle entitlement rules over identity and feature status.
// Purpose: Produce the per-bundle decision map served by `/services`.
// Dependencies: crate::{core, runtime::cache}
// ============================================================================

//! ## Overview
//! Evaluation is split in two. [`evaluate_bundles`] is a pure function over
//! the identity, the bundle filter, the registry and a feature snapshot.
//! [`EntitlementsEvaluator`] wires it to the feature-status cache and the
//! global override.
//!
//! SKU-based bundles fail closed: while the snapshot is degraded they are
//! never entitled. Attribute-only bundles are evaluated locally and are
//! unaffected by upstream health.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::Bundle;
use crate::core::BundleRegistry;
use crate::core::EntitlementDecision;
use crate::core::FeatureSnapshot;
use crate::core::Identity;
use crate::runtime::cache::FeatureStatusCache;

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Include/exclude restriction over registry bundles.
///
/// # Invariants
/// - A non-empty `include` takes precedence; `exclude` is then ignored.
/// - Unknown names match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleFilter {
    /// Bundles to keep.
    pub include: BTreeSet<String>,
    /// Bundles to drop.
    pub exclude: BTreeSet<String>,
}

impl BundleFilter {
    /// Builds a filter from comma-separated name lists.
    ///
    /// Blank items are skipped and surrounding whitespace is trimmed.
    #[must_use]
    pub fn from_csv(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include: split_names(include),
            exclude: split_names(exclude),
        }
    }

    /// Returns true when `name` is visible through this filter.
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.contains(name);
        }
        !self.exclude.contains(name)
    }
}

/// Splits a comma-separated list into a set of trimmed names.
fn split_names(list: Option<&str>) -> BTreeSet<String> {
    list.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

// ============================================================================
// SECTION: Pure Evaluation
// ============================================================================

/// Computes the decision map for the bundles visible through `filter`.
///
/// When `degraded` is set every SKU-based bundle is denied regardless of the
/// snapshot contents.
#[must_use]
pub fn evaluate_bundles(
    identity: &Identity,
    filter: &BundleFilter,
    registry: &BundleRegistry,
    snapshot: &FeatureSnapshot,
    degraded: bool,
) -> BTreeMap<String, EntitlementDecision> {
    registry
        .all()
        .filter(|bundle| filter.admits(&bundle.name))
        .map(|bundle| (bundle.name.clone(), decide(identity, bundle, snapshot, degraded)))
        .collect()
}

/// Applies the entitlement rule for one bundle.
fn decide(
    identity: &Identity,
    bundle: &Bundle,
    snapshot: &FeatureSnapshot,
    degraded: bool,
) -> EntitlementDecision {
    let attributes_pass = attributes_pass(identity, bundle);
    if !bundle.is_sku_based() {
        return EntitlementDecision {
            is_entitled: attributes_pass,
            is_trial: false,
        };
    }
    if degraded {
        return EntitlementDecision::DENIED;
    }
    snapshot.find(&bundle.name).map_or(EntitlementDecision::DENIED, |feature| {
        EntitlementDecision {
            is_entitled: attributes_pass && feature.entitled,
            is_trial: feature.is_eval,
        }
    })
}

/// Returns true when the identity satisfies every attribute the bundle uses.
fn attributes_pass(identity: &Identity, bundle: &Bundle) -> bool {
    (!bundle.use_valid_acc_num || identity.has_valid_account())
        && (!bundle.use_valid_org_id || identity.has_valid_org())
        && (!bundle.use_is_internal || identity.is_internal_user())
}

// ============================================================================
// SECTION: Evaluator
// ============================================================================

/// One `/services` evaluation request.
#[derive(Debug, Clone, Default)]
pub struct EvaluationRequest {
    /// Caller identity.
    pub identity: Identity,
    /// Bundle visibility filter.
    pub filter: BundleFilter,
    /// Bypass cached positive snapshots.
    pub force_fresh: bool,
}

/// Evaluation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Decisions keyed by bundle name.
    pub decisions: BTreeMap<String, EntitlementDecision>,
    /// Upstream status when the snapshot was a fail-closed marker.
    pub degraded_status: Option<u16>,
    /// Snapshot came from the cache.
    pub cache_hit: bool,
}

impl Evaluation {
    /// Returns true when SKU-based bundles were failed closed.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded_status.is_some()
    }
}

/// Evaluates entitlements against the registry and the feature-status cache.
pub struct EntitlementsEvaluator {
    /// Immutable bundle registry.
    registry: Arc<BundleRegistry>,
    /// Feature-status cache.
    cache: FeatureStatusCache,
    /// Global override entitling every bundle.
    entitle_all: bool,
}

impl EntitlementsEvaluator {
    /// Creates an evaluator.
    #[must_use]
    pub const fn new(
        registry: Arc<BundleRegistry>,
        cache: FeatureStatusCache,
        entitle_all: bool,
    ) -> Self {
        Self {
            registry,
            cache,
            entitle_all,
        }
    }

    /// Returns the bundle registry.
    #[must_use]
    pub fn registry(&self) -> &BundleRegistry {
        &self.registry
    }

    /// Returns true when the global override is active.
    #[must_use]
    pub const fn entitle_all(&self) -> bool {
        self.entitle_all
    }

    /// Evaluates one request.
    ///
    /// With the global override active every registry bundle is entitled,
    /// filters are ignored and no upstream call is made.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Evaluation {
        if self.entitle_all {
            return Evaluation {
                decisions: self
                    .registry
                    .all()
                    .map(|bundle| (bundle.name.clone(), EntitlementDecision::ENTITLED))
                    .collect(),
                degraded_status: None,
                cache_hit: false,
            };
        }
        let lookup = self.cache.get(&request.identity.org_id, request.force_fresh).await;
        let degraded = lookup.is_degraded();
        let decisions = evaluate_bundles(
            &request.identity,
            &request.filter,
            &self.registry,
            &lookup.snapshot,
            degraded,
        );
        Evaluation {
            decisions,
            degraded_status: degraded.then_some(lookup.status_code),
            cache_hit: lookup.cache_hit,
        }
    }
}
