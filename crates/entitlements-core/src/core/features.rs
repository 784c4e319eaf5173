// crates/entitlements-core/src/core/features.rs
// ============================================================================
// Module: Feature Snapshot
// Description: Upstream feature-status payload for one organization.
// Purpose: Provide the wire model consumed by the cache and the evaluator.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`FeatureSnapshot`] is the decoded response of the upstream
//! feature-status service for one organization. An empty snapshot is also
//! the fail-closed marker written by the cache on upstream failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Entitlement status of a single bundle feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Feature (bundle) name.
    pub name: String,
    /// Entitlement stems from an evaluation (trial) SKU.
    #[serde(default)]
    pub is_eval: bool,
    /// Organization is entitled to the feature.
    #[serde(default)]
    pub entitled: bool,
}

/// Feature-status snapshot for one organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Reported features; absent features are treated as not entitled.
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureSnapshot {
    /// Returns the empty snapshot used as the fail-closed marker.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// Returns the feature named `name`, if reported.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.name == name)
    }
}
