// crates/entitlements-api/src/state.rs
// ============================================================================
// Module: Application State
// Description: Shared handles passed to every handler.
// Purpose: Carry the evaluator, seat manager, proxies, and metrics.
// Dependencies: entitlements-core, serde
// ============================================================================

//! ## Overview
//! [`AppState`] is cloned into every handler invocation; all members are
//! shared handles, so cloning is cheap and no handler owns mutable state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use entitlements_core::ComplianceScreener;
use entitlements_core::EntitlementsEvaluator;
use entitlements_core::ErrorTranslator;
use entitlements_core::SeatManager;
use serde::Deserialize;
use serde::Serialize;

use crate::telemetry::EntitlementsMetrics;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Build information reported by `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Service API version.
    pub api_version: String,
    /// Source commit.
    pub commit: String,
}

/// Handles shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Entitlement evaluator.
    pub evaluator: Arc<EntitlementsEvaluator>,
    /// Seat manager.
    pub seats: Arc<SeatManager>,
    /// Compliance screener; absent when no compliance host is configured.
    pub compliance: Option<Arc<dyn ComplianceScreener>>,
    /// Error envelope translator.
    pub translator: ErrorTranslator,
    /// Metrics sink.
    pub metrics: Arc<dyn EntitlementsMetrics>,
    /// Build information.
    pub status: ServiceStatus,
    /// OpenAPI document served verbatim.
    pub openapi_path: PathBuf,
}
