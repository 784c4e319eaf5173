// crates/entitlements-core/src/interfaces/mod.rs
// ============================================================================
// Module: Entitlements Interfaces
// Description: Collaborator interfaces for feature status, accounts, and users.
// Purpose: Define the contract surfaces the runtime uses to reach upstreams.
// Dependencies: crate::core, async-trait, thiserror
// ============================================================================

//! ## Overview
//! Interfaces decouple the evaluator and the seat manager from the concrete
//! upstream systems. Each trait has an HTTP implementation in the providers
//! crate and an in-memory implementation in [`crate::runtime`]. Every
//! failure is reported as an [`UpstreamError`] variant so the error
//! translator can discriminate by kind.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::DirectoryUser;
use crate::core::FeatureSnapshot;
use crate::core::QuotaAuthorization;
use crate::core::QuotaAuthorizationRequest;
use crate::core::QuotaCost;
use crate::core::Subscription;
use crate::core::SubscriptionQuery;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure reported by an upstream collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Structured API error carrying an upstream error code.
    #[error("{service} api error {status} {code}: {reason}")]
    Api {
        /// Upstream service label.
        service: &'static str,
        /// HTTP status reported by the upstream.
        status: u16,
        /// Upstream error code, e.g. `ACCT-MGMT-11`.
        code: String,
        /// Upstream error identifier.
        identifier: Option<String>,
        /// Upstream operation identifier for support correlation.
        operation_id: Option<String>,
        /// Upstream reason text.
        reason: String,
    },
    /// Non-success response without a structured error body.
    #[error("{service} returned status {status}: {message}")]
    Client {
        /// Upstream service label.
        service: &'static str,
        /// HTTP status reported by the upstream.
        status: u16,
        /// Client error text.
        message: String,
    },
    /// User-directory failure.
    #[error("user directory returned status {status}: {message}")]
    Directory {
        /// HTTP status reported by the directory.
        status: u16,
        /// Directory error text.
        message: String,
    },
    /// Call exceeded its deadline.
    #[error("{service} request timed out")]
    Timeout {
        /// Upstream service label.
        service: &'static str,
    },
    /// Connection or protocol failure before a response was received.
    #[error("{service} request failed: {message}")]
    Transport {
        /// Upstream service label.
        service: &'static str,
        /// Transport error text.
        message: String,
    },
    /// Response body could not be decoded.
    #[error("{service} response could not be decoded: {message}")]
    Decode {
        /// Upstream service label.
        service: &'static str,
        /// Decode error text.
        message: String,
    },
}

impl UpstreamError {
    /// Returns the HTTP status observed from the upstream, if any.
    #[must_use]
    pub const fn observed_status(&self) -> Option<u16> {
        match self {
            Self::Api {
                status, ..
            }
            | Self::Client {
                status, ..
            }
            | Self::Directory {
                status, ..
            } => Some(*status),
            Self::Timeout {
                ..
            }
            | Self::Transport {
                ..
            }
            | Self::Decode {
                ..
            } => None,
        }
    }

    /// Returns the label of the upstream that failed.
    #[must_use]
    pub const fn service(&self) -> &'static str {
        match self {
            Self::Api {
                service, ..
            }
            | Self::Client {
                service, ..
            }
            | Self::Timeout {
                service,
            }
            | Self::Transport {
                service, ..
            }
            | Self::Decode {
                service, ..
            } => service,
            Self::Directory {
                ..
            } => "user-directory",
        }
    }
}

// ============================================================================
// SECTION: Feature Status
// ============================================================================

/// Upstream feature-status service.
#[async_trait]
pub trait FeatureStatusSource: Send + Sync {
    /// Fetches the feature snapshot for an organization.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] on non-success status, transport failure,
    /// timeout, or undecodable body.
    async fn fetch(&self, org_id: &str) -> Result<FeatureSnapshot, UpstreamError>;
}

// ============================================================================
// SECTION: Accounts
// ============================================================================

/// Upstream accounts/quota system of record for seats.
#[async_trait]
pub trait AccountsService: Send + Sync {
    /// Returns the quota cost matching `search` for an accounts-system org.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream call fails.
    async fn get_quota_cost(
        &self,
        ams_org_id: &str,
        search: &str,
    ) -> Result<Option<QuotaCost>, UpstreamError>;

    /// Returns one page of subscriptions matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream call fails.
    async fn get_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, UpstreamError>;

    /// Returns one subscription by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream call fails.
    async fn get_subscription(&self, subscription_id: &str)
    -> Result<Subscription, UpstreamError>;

    /// Deletes one subscription by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream call fails.
    async fn delete_subscription(&self, subscription_id: &str) -> Result<(), UpstreamError>;

    /// Requests quota for a seat assignment.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream call fails. A denied
    /// authorization is a successful call with `allowed == false`.
    async fn quota_authorization(
        &self,
        request: &QuotaAuthorizationRequest,
    ) -> Result<QuotaAuthorization, UpstreamError>;

    /// Converts a caller org identifier into the accounts-system org id.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream call fails or the org is
    /// unknown.
    async fn convert_user_org_id(&self, org_id: &str) -> Result<String, UpstreamError>;
}

// ============================================================================
// SECTION: User Directory
// ============================================================================

/// Upstream user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a user by login.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Directory`] when the user is unknown or the
    /// directory fails.
    async fn get_user(&self, username: &str) -> Result<DirectoryUser, UpstreamError>;
}

// ============================================================================
// SECTION: Compliance
// ============================================================================

/// Export-screening request for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRequest {
    /// User login.
    pub login: String,
    /// User email.
    pub email: String,
}

/// Export-screening response relayed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningResult {
    /// Upstream HTTP status.
    pub status: u16,
    /// Upstream JSON body.
    pub body: Value,
}

/// Upstream export-screening service.
#[async_trait]
pub trait ComplianceScreener: Send + Sync {
    /// Screens a user.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the upstream cannot be reached or
    /// answers with an undecodable body.
    async fn screen(&self, request: &ScreeningRequest) -> Result<ScreeningResult, UpstreamError>;
}
