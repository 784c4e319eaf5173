// crates/entitlements-providers/src/lib.rs
// ============================================================================
// Module: Entitlements Providers Library
// Description: HTTP clients for the upstream entitlement collaborators.
// Purpose: Implement the core collaborator interfaces over reqwest.
// Dependencies: entitlements-core, entitlements-config, reqwest
// ============================================================================

//! ## Overview
//! Each upstream system has one client here: feature status, the
//! accounts/quota system, the user directory, and compliance screening. All
//! clients share one process-wide [`reqwest::Client`] built by
//! [`build_http_client`] with the configured deadline and TLS material.
//! Failures are classified into [`entitlements_core::UpstreamError`]
//! variants; a client timeout always surfaces as `Timeout`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ams;
pub mod bop;
pub mod compliance;
pub mod features;
mod http;
pub mod tls;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ams::AmsClient;
pub use ams::AmsCredentials;
pub use bop::BopClient;
pub use compliance::ComplianceClient;
pub use features::HttpFeatureStatus;
pub use http::MAX_RESPONSE_BYTES;
pub use tls::ProviderInitError;
pub use tls::build_http_client;
