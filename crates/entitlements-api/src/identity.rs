// crates/entitlements-api/src/identity.rs
// ============================================================================
// Module: Identity Extraction
// Description: Decoding of the `x-rh-identity` request header.
// Purpose: Turn the gateway-supplied identity into a core `Identity`.
// Dependencies: axum, base64, entitlements-core, serde_json
// ============================================================================

//! ## Overview
//! The gateway authenticates callers and forwards a base64-encoded JSON
//! document in `x-rh-identity`. Only the fields the service needs are read:
//! account number, org id, principal type, and the user or service-account
//! block. The org id falls back to `identity.internal.org_id` for issuers that
//! only populate the internal block. A missing or undecodable header rejects
//! the request with `400`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use entitlements_core::Identity;
use entitlements_core::PrincipalType;
use serde::Deserialize;
use thiserror::Error;

use crate::error::ApiError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the caller identity.
pub const IDENTITY_HEADER: &str = "x-rh-identity";
/// Principal type label of service accounts.
const SERVICE_ACCOUNT_TYPE: &str = "ServiceAccount";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity header failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Header absent.
    #[error("missing {IDENTITY_HEADER} header")]
    Missing,
    /// Header is not valid base64 text.
    #[error("{IDENTITY_HEADER} header is not valid base64")]
    Encoding,
    /// Decoded header is not an identity document.
    #[error("{IDENTITY_HEADER} header is not a valid identity: {0}")]
    Document(String),
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Top-level identity document.
#[derive(Debug, Deserialize)]
struct IdentityDocument {
    /// Identity block.
    identity: IdentityBody,
}

/// Identity block of the document.
#[derive(Debug, Default, Deserialize)]
struct IdentityBody {
    /// Customer account number.
    #[serde(default)]
    account_number: String,
    /// Organization identifier.
    #[serde(default)]
    org_id: String,
    /// Principal type label.
    #[serde(default, rename = "type")]
    principal: String,
    /// Internal block some issuers use for the org id.
    #[serde(default)]
    internal: Option<InternalBody>,
    /// User principal details.
    #[serde(default)]
    user: Option<UserBody>,
    /// Service-account principal details.
    #[serde(default)]
    service_account: Option<ServiceAccountBody>,
}

/// Internal block.
#[derive(Debug, Default, Deserialize)]
struct InternalBody {
    /// Organization identifier.
    #[serde(default)]
    org_id: String,
}

/// User principal details.
#[derive(Debug, Default, Deserialize)]
struct UserBody {
    /// Login.
    #[serde(default)]
    username: String,
    /// Email.
    #[serde(default)]
    email: String,
    /// Internal-user flag.
    #[serde(default)]
    is_internal: bool,
    /// Organization-administrator flag.
    #[serde(default)]
    is_org_admin: bool,
}

/// Service-account principal details.
#[derive(Debug, Default, Deserialize)]
struct ServiceAccountBody {
    /// Service-account login.
    #[serde(default)]
    username: String,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Decodes an `x-rh-identity` header value.
///
/// # Errors
///
/// Returns [`IdentityError`] when the value is not base64 or not an identity
/// document.
pub fn parse_identity_header(value: &str) -> Result<Identity, IdentityError> {
    let decoded = STANDARD.decode(value.trim()).map_err(|_| IdentityError::Encoding)?;
    let document: IdentityDocument = serde_json::from_slice(&decoded)
        .map_err(|err| IdentityError::Document(err.to_string()))?;
    let body = document.identity;

    let org_id = if body.org_id.is_empty() {
        body.internal.map(|internal| internal.org_id).unwrap_or_default()
    } else {
        body.org_id
    };
    let principal_type = if body.principal == SERVICE_ACCOUNT_TYPE {
        PrincipalType::ServiceAccount
    } else {
        PrincipalType::User
    };
    let user = body.user.unwrap_or_default();
    let username = match (principal_type, body.service_account) {
        (PrincipalType::ServiceAccount, Some(service_account)) => service_account.username,
        _ => user.username,
    };
    Ok(Identity {
        account_number: body.account_number,
        org_id,
        is_internal: user.is_internal,
        email: user.email,
        username,
        principal_type,
        org_admin: user.is_org_admin,
    })
}

/// Reads and decodes the identity header from `headers`.
///
/// # Errors
///
/// Returns [`IdentityError::Missing`] when the header is absent and the
/// parse errors of [`parse_identity_header`] otherwise.
pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, IdentityError> {
    let value = headers.get(IDENTITY_HEADER).ok_or(IdentityError::Missing)?;
    let value = value.to_str().map_err(|_| IdentityError::Encoding)?;
    parse_identity_header(value)
}

// ============================================================================
// SECTION: Extractor
// ============================================================================

/// Authenticated caller extracted from the request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_headers(&parts.headers)
            .map(Self)
            .map_err(|err| ApiError::bad_request(err.to_string()))
    }
}
