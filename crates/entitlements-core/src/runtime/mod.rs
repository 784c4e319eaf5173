// crates/entitlements-core/src/runtime/mod.rs
// ============================================================================
// Module: Entitlements Runtime
// Description: Cache, evaluator, seat manager, and error translation.
// Purpose: Group the request-time engines behind a single module.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime components turn a caller identity into entitlement decisions and
//! seat operations. They reach upstream systems only through
//! [`crate::interfaces`]; in-memory collaborators live in [`memory`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cache;
pub mod errors;
pub mod evaluator;
pub mod memory;
pub mod query;
pub mod seats;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheLookup;
pub use cache::FeatureStatusCache;
pub use cache::FeatureStatusCacheConfig;
pub use errors::ACCT_MGMT_11;
pub use errors::ErrorEnvelope;
pub use errors::ErrorTranslator;
pub use errors::STATUS_INTERNAL;
pub use errors::SeatError;
pub use evaluator::BundleFilter;
pub use evaluator::EntitlementsEvaluator;
pub use evaluator::Evaluation;
pub use evaluator::EvaluationRequest;
pub use evaluator::evaluate_bundles;
pub use memory::AMS_ORG_PREFIX;
pub use memory::InMemoryAccounts;
pub use memory::InMemoryUserDirectory;
pub use memory::StaticFeatureStatus;
pub use query::SearchQuery;
pub use seats::SEAT_PRODUCT_ID;
pub use seats::SEATS_PATH;
pub use seats::SeatManager;
pub use seats::UNKNOWN_PLACEHOLDER;
pub use seats::offset_for_page;
pub use seats::page_for_offset;
