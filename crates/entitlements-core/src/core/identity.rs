// crates/entitlements-core/src/core/identity.rs
// ============================================================================
// Module: Caller Identity
// Description: Parsed caller identity consumed by the evaluator and seat manager.
// Purpose: Centralize the validity predicates over account and org identifiers.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Identity`] is the already-authenticated caller as produced by the
//! identity middleware. The validity predicates here are the single source
//! for "invalid account" and "invalid org" checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel identifier used by upstream identity issuers for "no value".
const INVALID_ID_SENTINEL: &str = "-1";
/// Email domain required for the internal-user attribute.
pub const INTERNAL_EMAIL_DOMAIN: &str = "@redhat.com";

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Authenticated principal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrincipalType {
    /// Human user principal.
    #[default]
    User,
    /// Machine service-account principal.
    ServiceAccount,
}

/// Caller identity supplied by the identity middleware.
///
/// # Invariants
/// - `account_number` of `""` or `"-1"` denotes an invalid account.
/// - `org_id` of `""` or `"-1"` denotes an invalid org.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Customer account number.
    pub account_number: String,
    /// Organization identifier.
    pub org_id: String,
    /// Whether the issuer flagged the caller as internal.
    pub is_internal: bool,
    /// Caller email address.
    pub email: String,
    /// Caller login name, empty when the issuer supplied none.
    pub username: String,
    /// Principal kind.
    pub principal_type: PrincipalType,
    /// Whether the caller is an administrator of its organization.
    pub org_admin: bool,
}

impl Identity {
    /// Returns true when the account number is usable.
    #[must_use]
    pub fn has_valid_account(&self) -> bool {
        is_valid_id(&self.account_number)
    }

    /// Returns true when the org identifier is usable.
    #[must_use]
    pub fn has_valid_org(&self) -> bool {
        is_valid_id(&self.org_id)
    }

    /// Returns true when the caller is internal and uses an internal email.
    #[must_use]
    pub fn is_internal_user(&self) -> bool {
        self.is_internal && self.email.ends_with(INTERNAL_EMAIL_DOMAIN)
    }
}

/// Returns true unless the identifier is empty or the `-1` sentinel.
#[must_use]
pub fn is_valid_id(value: &str) -> bool {
    !value.is_empty() && value != INVALID_ID_SENTINEL
}
