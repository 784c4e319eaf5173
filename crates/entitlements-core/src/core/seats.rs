// crates/entitlements-core/src/core/seats.rs
// ============================================================================
// Module: Seat Types
// Description: Seat records, list pages, and upstream quota/subscription models.
// Purpose: Define the seat API wire forms and the accounts-system data model.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Seats are not stored by this service. A seat is an upstream subscription
//! of the seat-limited plan; the types here describe the caller-facing page,
//! the upstream records the seat manager reads, and the quota authorization
//! exchange used to assign a seat.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Caller-Facing Types
// ============================================================================

/// A seat as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Upstream subscription identifier.
    pub subscription_id: String,
    /// Login of the user holding the seat.
    pub account_username: String,
    /// Seat holder first name.
    pub first_name: String,
    /// Seat holder last name.
    pub last_name: String,
    /// Seat holder email.
    pub email: String,
    /// Upstream subscription status.
    pub status: String,
}

/// Page metadata for a seat listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMeta {
    /// Number of seats in this page.
    pub count: usize,
}

/// Offset/limit navigation links for a seat listing.
///
/// # Invariants
/// - Links are composed speculatively; `next` may point at an empty page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLinks {
    /// Link to the first page.
    pub first: String,
    /// Link to the previous page.
    pub previous: String,
    /// Link to the next page.
    pub next: String,
}

/// One page of seats plus the organization's seat quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPage {
    /// Page metadata.
    pub meta: SeatMeta,
    /// Navigation links.
    pub links: SeatLinks,
    /// Seats in this page.
    pub data: Vec<Seat>,
    /// Seats the organization may assign.
    pub allowed: i64,
    /// Seats currently assigned.
    pub consumed: i64,
}

/// Seat listing parameters.
///
/// # Invariants
/// - Valid requests have `limit > 0` and `offset >= 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSeatsRequest {
    /// Maximum seats per page.
    pub limit: i64,
    /// Number of seats to skip, snapped down to a page boundary.
    pub offset: i64,
    /// Optional subscription status filter.
    pub statuses: Vec<String>,
}

impl Default for ListSeatsRequest {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            statuses: Vec::new(),
        }
    }
}

/// Seat assignment request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignSeatRequest {
    /// Login of the user receiving the seat.
    pub account_username: String,
}

/// Seat assignment response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedSeat {
    /// Subscription created for the seat.
    pub subscription_id: String,
    /// Login of the user holding the seat.
    pub account_username: String,
}

// ============================================================================
// SECTION: Upstream Accounts Types
// ============================================================================

/// Page-based subscription search against the accounts system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionQuery {
    /// Search expression built by [`crate::runtime::SearchQuery`].
    pub search: String,
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub size: u64,
}

/// Seat quota for an organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCost {
    /// Quota identifier.
    #[serde(default)]
    pub quota_id: String,
    /// Seats the organization may assign.
    #[serde(default)]
    pub allowed: i64,
    /// Seats currently assigned.
    #[serde(default)]
    pub consumed: i64,
    /// Version token serializing quota authorizations.
    #[serde(default)]
    pub version: Option<String>,
}

/// Account that created a subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCreator {
    /// Account login.
    #[serde(default)]
    pub username: Option<String>,
    /// Account first name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Account last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Account email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Upstream subscription backing a seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identifier.
    pub id: String,
    /// Owning organization in the accounts-system representation.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Subscription status.
    #[serde(default)]
    pub status: String,
    /// Creator account, when the upstream returned it.
    #[serde(default)]
    pub creator: Option<SubscriptionCreator>,
}

/// Resource requested in a quota authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaResource {
    /// Resource name.
    pub resource_name: String,
    /// Resource type.
    pub resource_type: String,
    /// Billing model.
    pub billing_model: String,
    /// Product identifier.
    pub product: String,
    /// Requested amount.
    pub count: u32,
}

/// Quota authorization request reserving one seat for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAuthorizationRequest {
    /// Login of the user receiving the seat.
    pub account_username: String,
    /// Product identifier.
    pub product_id: String,
    /// Quota version observed before the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_version: Option<String>,
    /// Reserve the quota when allowed.
    pub reserve: bool,
    /// Requested resources.
    pub resources: Vec<QuotaResource>,
}

/// Quota authorization outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAuthorization {
    /// Authorization granted.
    pub allowed: bool,
    /// Number of resources that exceed the quota.
    pub excess_resources: usize,
    /// Subscription created when the authorization is granted.
    pub subscription_id: Option<String>,
}

// ============================================================================
// SECTION: Upstream Directory Types
// ============================================================================

/// User record returned by the user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// User login.
    pub username: String,
    /// Organization the user belongs to.
    #[serde(default)]
    pub org_id: String,
    /// User email.
    #[serde(default)]
    pub email: String,
    /// User is an administrator of its organization.
    #[serde(default)]
    pub is_org_admin: bool,
}
