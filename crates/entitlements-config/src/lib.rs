// crates/entitlements-config/src/lib.rs
// ============================================================================
// Module: Entitlements Config Library
// Description: Environment configuration model and validation.
// Purpose: Single source of truth for the `ENT_` environment surface.
// Dependencies: thiserror, url
// ============================================================================

//! ## Overview
//! `entitlements-config` reads the `ENT_`-prefixed environment once at
//! startup, applies defaults, and validates the result. Invalid
//! configuration fails closed: the service does not start.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
