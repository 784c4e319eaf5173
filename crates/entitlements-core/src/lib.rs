// crates/entitlements-core/src/lib.rs
// ============================================================================
// Module: Entitlements Core Library
// Description: Public API surface for the entitlements decision core.
// Purpose: Expose domain types, collaborator interfaces, and runtime engines.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Entitlements core answers two questions for an authenticated caller: which
//! product bundles the caller's organization is entitled to (and whether any
//! are trials), and which seats of a seat-limited bundle are assigned. It
//! owns the bundle registry, the fail-closed feature-status cache, the
//! entitlement evaluator, and the seat manager. Upstream systems are reached
//! only through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AccountsService;
pub use interfaces::ComplianceScreener;
pub use interfaces::FeatureStatusSource;
pub use interfaces::ScreeningRequest;
pub use interfaces::ScreeningResult;
pub use interfaces::UpstreamError;
pub use interfaces::UserDirectory;
pub use runtime::BundleFilter;
pub use runtime::CacheLookup;
pub use runtime::EntitlementsEvaluator;
pub use runtime::ErrorEnvelope;
pub use runtime::ErrorTranslator;
pub use runtime::Evaluation;
pub use runtime::EvaluationRequest;
pub use runtime::FeatureStatusCache;
pub use runtime::FeatureStatusCacheConfig;
pub use runtime::InMemoryAccounts;
pub use runtime::InMemoryUserDirectory;
pub use runtime::SearchQuery;
pub use runtime::SeatError;
pub use runtime::SeatManager;
pub use runtime::StaticFeatureStatus;
pub use runtime::evaluate_bundles;
