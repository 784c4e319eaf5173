// crates/entitlements-core/src/core/decision.rs
// ============================================================================
// Module: Entitlement Decision
// Description: Per-bundle entitlement outcome.
// Purpose: Define the stable wire form of entitlement decisions.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Decisions serialize as `{"is_entitled": bool, "is_trial": bool}` and are
//! keyed by bundle name in the `/services` response body.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Entitlement outcome for one bundle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    /// Caller's organization may use the bundle.
    pub is_entitled: bool,
    /// Entitlement comes from an evaluation (trial) SKU.
    pub is_trial: bool,
}

impl EntitlementDecision {
    /// Entitled, non-trial decision.
    pub const ENTITLED: Self = Self {
        is_entitled: true,
        is_trial: false,
    };
    /// Denied, non-trial decision.
    pub const DENIED: Self = Self {
        is_entitled: false,
        is_trial: false,
    };
}
