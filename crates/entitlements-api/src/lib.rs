// crates/entitlements-api/src/lib.rs
// ============================================================================
// Module: Entitlements API Library
// Description: HTTP surface of the entitlements service.
// Purpose: Route caller requests to the evaluator, seat manager, and proxies.
// Dependencies: axum, entitlements-core, entitlements-providers, prometheus
// ============================================================================

//! ## Overview
//! The API crate owns everything that touches HTTP on the inbound side:
//! identity extraction from `x-rh-identity`, the handlers behind
//! `/api/entitlements/v1`, the `/status`, `/metrics` and OpenAPI endpoints,
//! request metrics, and the server bootstrap that wires configuration into
//! collaborators. Domain decisions stay in `entitlements-core`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod handlers;
pub mod identity;
pub mod server;
pub mod state;
pub mod telemetry;
#[cfg(test)]
mod test_support;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ApiError;
pub use identity::CallerIdentity;
pub use identity::IDENTITY_HEADER;
pub use identity::IdentityError;
pub use identity::parse_identity_header;
pub use server::EntitlementsServer;
pub use server::ServerError;
pub use server::build_router;
pub use state::AppState;
pub use state::ServiceStatus;
pub use telemetry::CacheOutcome;
pub use telemetry::EntitlementsMetrics;
pub use telemetry::MetricsError;
pub use telemetry::NoopMetrics;
pub use telemetry::PrometheusMetrics;
