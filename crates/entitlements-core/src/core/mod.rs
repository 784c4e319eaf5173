// crates/entitlements-core/src/core/mod.rs
// ============================================================================
// Module: Entitlements Core Types
// Description: Canonical identity, bundle, feature, decision, and seat types.
// Purpose: Provide stable, serializable types shared by every service layer.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types define the caller identity, the bundle registry, upstream
//! feature snapshots, entitlement decisions, and seat records. These types
//! are the canonical source of truth for the HTTP surface and the upstream
//! clients.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod bundle;
pub mod decision;
pub mod features;
pub mod identity;
pub mod seats;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bundle::Bundle;
pub use bundle::BundleDefinition;
pub use bundle::BundleError;
pub use bundle::BundleRegistry;
pub use bundle::DEFAULT_PAID_SUFFIX;
pub use decision::EntitlementDecision;
pub use features::Feature;
pub use features::FeatureSnapshot;
pub use identity::Identity;
pub use identity::INTERNAL_EMAIL_DOMAIN;
pub use identity::PrincipalType;
pub use identity::is_valid_id;
pub use seats::AssignSeatRequest;
pub use seats::AssignedSeat;
pub use seats::DirectoryUser;
pub use seats::ListSeatsRequest;
pub use seats::QuotaAuthorization;
pub use seats::QuotaAuthorizationRequest;
pub use seats::QuotaCost;
pub use seats::QuotaResource;
pub use seats::Seat;
pub use seats::SeatLinks;
pub use seats::SeatMeta;
pub use seats::SeatPage;
pub use seats::Subscription;
pub use seats::SubscriptionCreator;
pub use seats::SubscriptionQuery;
