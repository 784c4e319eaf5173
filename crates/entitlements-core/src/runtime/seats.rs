// crates/entitlements-core/src/runtime/seats.rs
// ============================================================================
// Module: Seat Manager
// Description: Authorization and pagination over the upstream seat system.
// Purpose: List, assign, and revoke seats of the seat-limited bundle.
// Dependencies: crate::{core, interfaces, runtime}, tokio, tracing, url
// ============================================================================

//! ## Overview
//! Seats are upstream subscriptions of the seat-limited plan; the manager
//! holds no seat state. It enforces that only org administrators change
//! seats and that callers only touch subscriptions of their own
//! organization, and it translates caller offset/limit paging into the
//! upstream's 1-based page/size paging.
//!
//! The upstream returns no total count, so `next` links are speculative and
//! callers stop when a page comes back empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use tracing::warn;
use url::form_urlencoded;

use crate::core::AssignSeatRequest;
use crate::core::AssignedSeat;
use crate::core::Identity;
use crate::core::ListSeatsRequest;
use crate::core::QuotaAuthorizationRequest;
use crate::core::QuotaResource;
use crate::core::Seat;
use crate::core::SeatLinks;
use crate::core::SeatMeta;
use crate::core::SeatPage;
use crate::core::Subscription;
use crate::core::SubscriptionQuery;
use crate::interfaces::AccountsService;
use crate::interfaces::UserDirectory;
use crate::runtime::errors::SeatError;
use crate::runtime::query::SearchQuery;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Plan and product identifier of the seat-limited bundle.
pub const SEAT_PRODUCT_ID: &str = "AnsibleWisdom";
/// Quota identifier pattern of the seat quota.
pub const SEAT_QUOTA_PATTERN: &str = "seat|ansible.wisdom%";
/// Caller-facing seat collection path used in pagination links.
pub const SEATS_PATH: &str = "/api/entitlements/v1/seats";
/// Placeholder for seat holder fields the upstream did not return.
pub const UNKNOWN_PLACEHOLDER: &str = "UNKNOWN";
/// Resource name requested for one seat.
const SEAT_RESOURCE_NAME: &str = "ansible.wisdom";
/// Resource type requested for one seat.
const SEAT_RESOURCE_TYPE: &str = "seat";
/// Billing model requested for one seat.
const SEAT_BILLING_MODEL: &str = "standard";

// ============================================================================
// SECTION: Pagination
// ============================================================================

/// Returns the 1-based upstream page containing `offset`.
///
/// Offsets are snapped down to the nearest page boundary.
#[must_use]
pub const fn page_for_offset(offset: u64, limit: u64) -> u64 {
    match offset.checked_div(limit) {
        Some(pages) => pages.saturating_add(1),
        None => 1,
    }
}

/// Returns the first offset of a 1-based upstream page.
#[must_use]
pub const fn offset_for_page(page: u64, limit: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(limit)
}

// ============================================================================
// SECTION: Seat Manager
// ============================================================================

/// Seat operations over the accounts system and the user directory.
pub struct SeatManager {
    /// Accounts/quota system of record.
    accounts: Arc<dyn AccountsService>,
    /// User directory for assignment targets.
    directory: Arc<dyn UserDirectory>,
}

impl SeatManager {
    /// Creates a seat manager.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountsService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            accounts,
            directory,
        }
    }

    /// Lists one page of the caller organization's seats with its quota.
    ///
    /// # Errors
    ///
    /// Returns [`SeatError::BadRequest`] for a non-positive limit, a negative
    /// offset, or a status or org id containing a quote; upstream failures
    /// propagate as [`SeatError::Upstream`].
    pub async fn list_seats(
        &self,
        identity: &Identity,
        request: &ListSeatsRequest,
    ) -> Result<SeatPage, SeatError> {
        let (limit, offset) = validate_paging(request)?;
        if request.statuses.iter().any(|status| status.contains('\'')) {
            return Err(SeatError::BadRequest("status filter must not contain quotes".to_string()));
        }

        let ams_org_id = self.convert_org_id(identity).await?;
        let mut search = SearchQuery::new()
            .like("plan.id", SEAT_PRODUCT_ID)
            .and()
            .equals("organization_id", &ams_org_id);
        if !request.statuses.is_empty() {
            search = search.and().in_values("status", &request.statuses);
        }
        let query = SubscriptionQuery {
            search: search.build(),
            page: page_for_offset(offset, limit),
            size: limit,
        };
        let quota_search = SearchQuery::new().like("quota_id", SEAT_QUOTA_PATTERN).build();

        let (subscriptions, quota) = tokio::try_join!(
            self.accounts.get_subscriptions(&query),
            self.accounts.get_quota_cost(&ams_org_id, &quota_search),
        )?;

        let data: Vec<Seat> = subscriptions.into_iter().map(seat_from_subscription).collect();
        let quota = quota.unwrap_or_default();
        Ok(SeatPage {
            meta: SeatMeta {
                count: data.len(),
            },
            links: page_links(limit, offset, &request.statuses),
            data,
            allowed: quota.allowed,
            consumed: quota.consumed,
        })
    }

    /// Assigns a seat to a user of the caller's organization.
    ///
    /// # Errors
    ///
    /// Returns [`SeatError::Forbidden`] when the caller is not an org admin,
    /// the user belongs to another organization, or quota is denied;
    /// [`SeatError::Conflict`] when the quota is exhausted; upstream failures
    /// propagate as [`SeatError::Upstream`].
    pub async fn assign_seat(
        &self,
        identity: &Identity,
        request: &AssignSeatRequest,
    ) -> Result<AssignedSeat, SeatError> {
        require_org_admin(identity)?;
        let username = request.account_username.trim();
        if username.is_empty() {
            return Err(SeatError::BadRequest("account_username is required".to_string()));
        }

        let user = self.directory.get_user(username).await?;
        if user.org_id != identity.org_id {
            return Err(SeatError::Forbidden(format!(
                "user '{username}' does not belong to organization {}",
                identity.org_id
            )));
        }

        let ams_org_id = self.convert_org_id(identity).await?;
        let quota_search = SearchQuery::new().like("quota_id", SEAT_QUOTA_PATTERN).build();
        let quota = self.accounts.get_quota_cost(&ams_org_id, &quota_search).await?;
        let authorization = self
            .accounts
            .quota_authorization(&QuotaAuthorizationRequest {
                account_username: username.to_string(),
                product_id: SEAT_PRODUCT_ID.to_string(),
                quota_version: quota.and_then(|quota| quota.version),
                reserve: true,
                resources: vec![QuotaResource {
                    resource_name: SEAT_RESOURCE_NAME.to_string(),
                    resource_type: SEAT_RESOURCE_TYPE.to_string(),
                    billing_model: SEAT_BILLING_MODEL.to_string(),
                    product: SEAT_PRODUCT_ID.to_string(),
                    count: 1,
                }],
            })
            .await?;

        if !authorization.allowed {
            if authorization.excess_resources > 0 {
                return Err(SeatError::Conflict(format!(
                    "no seats available for organization {}",
                    identity.org_id
                )));
            }
            return Err(SeatError::Forbidden(format!("seat assignment for '{username}' was denied")));
        }
        let subscription_id = authorization.subscription_id.ok_or_else(|| {
            SeatError::Internal("quota authorization returned no subscription".to_string())
        })?;
        Ok(AssignedSeat {
            subscription_id,
            account_username: username.to_string(),
        })
    }

    /// Revokes a seat of the caller's organization.
    ///
    /// # Errors
    ///
    /// Returns [`SeatError::Forbidden`] when the caller is not an org admin
    /// or the subscription belongs to another organization;
    /// [`SeatError::Internal`] when the subscription has no organization;
    /// upstream failures propagate as [`SeatError::Upstream`].
    pub async fn revoke_seat(
        &self,
        identity: &Identity,
        subscription_id: &str,
    ) -> Result<(), SeatError> {
        require_org_admin(identity)?;
        let subscription = self.accounts.get_subscription(subscription_id).await?;
        let Some(subscription_org) =
            subscription.organization_id.filter(|organization| !organization.is_empty())
        else {
            return Err(SeatError::Internal(format!(
                "subscription {subscription_id} has no organization"
            )));
        };

        let ams_org_id = self.convert_org_id(identity).await?;
        if ams_org_id != subscription_org {
            return Err(SeatError::Forbidden(format!(
                "subscription organization {subscription_org} does not match caller organization \
                 {ams_org_id}"
            )));
        }
        self.accounts.delete_subscription(subscription_id).await?;
        Ok(())
    }

    /// Resolves the caller's accounts-system org id.
    ///
    /// Both ids end up quoted in search expressions, so quotes are rejected.
    async fn convert_org_id(&self, identity: &Identity) -> Result<String, SeatError> {
        if identity.org_id.contains('\'') {
            return Err(SeatError::BadRequest("org id must not contain quotes".to_string()));
        }
        let ams_org_id = self.accounts.convert_user_org_id(&identity.org_id).await?;
        if ams_org_id.contains('\'') {
            return Err(SeatError::Internal(format!(
                "accounts system returned an unusable org id for {}",
                identity.org_id
            )));
        }
        Ok(ams_org_id)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects callers that are not organization administrators.
fn require_org_admin(identity: &Identity) -> Result<(), SeatError> {
    if identity.org_admin {
        Ok(())
    } else {
        Err(SeatError::Forbidden("caller is not an organization administrator".to_string()))
    }
}

/// Validates paging input and returns `(limit, offset)`.
fn validate_paging(request: &ListSeatsRequest) -> Result<(u64, u64), SeatError> {
    let limit = u64::try_from(request.limit)
        .ok()
        .filter(|limit| *limit > 0)
        .ok_or_else(|| SeatError::BadRequest("limit must be greater than 0".to_string()))?;
    let offset = u64::try_from(request.offset)
        .map_err(|_| SeatError::BadRequest("offset must not be negative".to_string()))?;
    Ok((limit, offset))
}

/// Composes the first/previous/next links for a page.
///
/// Query values are form-encoded so statuses cannot add parameters.
fn page_links(limit: u64, offset: u64, statuses: &[String]) -> SeatLinks {
    let limit_value = limit.to_string();
    let link = |offset: u64| {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("limit", &limit_value).append_pair("offset", &offset.to_string());
        for status in statuses {
            query.append_pair("status", status);
        }
        format!("{SEATS_PATH}?{}", query.finish())
    };
    SeatLinks {
        first: link(0),
        previous: link(offset.saturating_sub(limit)),
        next: link(offset.saturating_add(limit)),
    }
}

/// Maps an upstream subscription to a seat, filling missing holder data.
fn seat_from_subscription(subscription: Subscription) -> Seat {
    let creator = subscription.creator.unwrap_or_default();
    let complete =
        creator.username.is_some() && creator.first_name.is_some() && creator.last_name.is_some();
    if !complete {
        warn!(
            subscription_id = %subscription.id,
            "subscription is missing creator data; using placeholders"
        );
    }
    let placeholder = || UNKNOWN_PLACEHOLDER.to_string();
    Seat {
        subscription_id: subscription.id,
        account_username: creator.username.unwrap_or_else(placeholder),
        first_name: creator.first_name.unwrap_or_else(placeholder),
        last_name: creator.last_name.unwrap_or_else(placeholder),
        email: creator.email.unwrap_or_default(),
        status: subscription.status,
    }
}
