// crates/entitlements-core/src/runtime/memory.rs
// ============================================================================
// Module: In-Memory Collaborators
// Description: In-memory feature status, accounts, and user directory.
// Purpose: Back tests and mock-mode local runs without upstream systems.
// Dependencies: crate::{core, interfaces}, async-trait
// ============================================================================

//! ## Overview
//! These collaborators implement the upstream interfaces over process-local
//! state. They record the calls they receive so tests can assert on the
//! exact upstream traffic a component would have produced. They are not
//! intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use crate::core::DirectoryUser;
use crate::core::FeatureSnapshot;
use crate::core::QuotaAuthorization;
use crate::core::QuotaAuthorizationRequest;
use crate::core::QuotaCost;
use crate::core::Subscription;
use crate::core::SubscriptionCreator;
use crate::core::SubscriptionQuery;
use crate::core::is_valid_id;
use crate::interfaces::AccountsService;
use crate::interfaces::FeatureStatusSource;
use crate::interfaces::UpstreamError;
use crate::interfaces::UserDirectory;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Service label reported by the in-memory accounts service.
const ACCOUNTS_SERVICE: &str = "accounts";
/// Prefix used for default accounts-system org ids.
pub const AMS_ORG_PREFIX: &str = "AMSORG";
/// Status reported for unknown records.
const STATUS_NOT_FOUND: u16 = 404;

// ============================================================================
// SECTION: Feature Status
// ============================================================================

/// Feature-status source serving fixed snapshots.
#[derive(Debug, Clone, Default)]
pub struct StaticFeatureStatus {
    /// Snapshot served to orgs without a dedicated entry.
    default_snapshot: FeatureSnapshot,
    /// Per-org snapshots.
    snapshots: Arc<Mutex<BTreeMap<String, FeatureSnapshot>>>,
    /// Failure returned instead of a snapshot, when set.
    failure: Arc<Mutex<Option<UpstreamError>>>,
    /// Number of fetches served.
    calls: Arc<AtomicUsize>,
}

impl StaticFeatureStatus {
    /// Creates a source serving `snapshot` to every org.
    #[must_use]
    pub fn new(snapshot: FeatureSnapshot) -> Self {
        Self {
            default_snapshot: snapshot,
            ..Self::default()
        }
    }

    /// Serves `snapshot` to `org_id` only.
    #[must_use]
    pub fn with_org(self, org_id: &str, snapshot: FeatureSnapshot) -> Self {
        lock(&self.snapshots).insert(org_id.to_string(), snapshot);
        self
    }

    /// Makes every subsequent fetch fail with `error`, or succeed again on `None`.
    pub fn set_failure(&self, error: Option<UpstreamError>) {
        *lock(&self.failure) = error;
    }

    /// Returns the number of fetches served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeatureStatusSource for StaticFeatureStatus {
    async fn fetch(&self, org_id: &str) -> Result<FeatureSnapshot, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.failure).clone() {
            return Err(error);
        }
        Ok(lock(&self.snapshots).get(org_id).cloned().unwrap_or_else(|| self.default_snapshot.clone()))
    }
}

// ============================================================================
// SECTION: Accounts
// ============================================================================

/// Mutable state behind [`InMemoryAccounts`].
#[derive(Debug, Default)]
struct AccountsState {
    /// Explicit caller org to accounts-system org mappings.
    org_mappings: BTreeMap<String, String>,
    /// Seat quota by accounts-system org id.
    quotas: BTreeMap<String, QuotaCost>,
    /// Subscriptions by identifier.
    subscriptions: BTreeMap<String, Subscription>,
    /// Scripted authorization outcome overriding quota accounting.
    scripted_authorization: Option<QuotaAuthorization>,
    /// Failure returned by every call, when set.
    failure: Option<UpstreamError>,
    /// Subscription queries received.
    subscription_queries: Vec<SubscriptionQuery>,
    /// Quota searches received as `(ams_org_id, search)`.
    quota_searches: Vec<(String, String)>,
    /// Authorization requests received.
    authorization_requests: Vec<QuotaAuthorizationRequest>,
    /// Identifiers of deleted subscriptions.
    deleted: Vec<String>,
    /// Counter for generated subscription identifiers.
    next_subscription: u64,
}

/// Accounts/quota system over in-memory state.
///
/// # Invariants
/// - Caller orgs without an explicit mapping convert to `AMSORG<org>`.
/// - A granted authorization creates a subscription in the org whose quota
///   version matched the request.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    /// Shared mutable state.
    state: Arc<Mutex<AccountsState>>,
}

impl InMemoryAccounts {
    /// Creates an empty accounts service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a caller org to an explicit accounts-system org id.
    #[must_use]
    pub fn with_org_mapping(self, org_id: &str, ams_org_id: &str) -> Self {
        lock(&self.state).org_mappings.insert(org_id.to_string(), ams_org_id.to_string());
        self
    }

    /// Sets the seat quota of an accounts-system org.
    #[must_use]
    pub fn with_quota(self, ams_org_id: &str, quota: QuotaCost) -> Self {
        lock(&self.state).quotas.insert(ams_org_id.to_string(), quota);
        self
    }

    /// Adds a subscription.
    #[must_use]
    pub fn with_subscription(self, subscription: Subscription) -> Self {
        lock(&self.state).subscriptions.insert(subscription.id.clone(), subscription);
        self
    }

    /// Answers every authorization with `authorization`.
    #[must_use]
    pub fn with_authorization(self, authorization: QuotaAuthorization) -> Self {
        lock(&self.state).scripted_authorization = Some(authorization);
        self
    }

    /// Makes every subsequent call fail with `error`, or succeed again on `None`.
    pub fn set_failure(&self, error: Option<UpstreamError>) {
        lock(&self.state).failure = error;
    }

    /// Returns the subscription queries received so far.
    #[must_use]
    pub fn subscription_queries(&self) -> Vec<SubscriptionQuery> {
        lock(&self.state).subscription_queries.clone()
    }

    /// Returns the quota searches received so far.
    #[must_use]
    pub fn quota_searches(&self) -> Vec<(String, String)> {
        lock(&self.state).quota_searches.clone()
    }

    /// Returns the authorization requests received so far.
    #[must_use]
    pub fn authorization_requests(&self) -> Vec<QuotaAuthorizationRequest> {
        lock(&self.state).authorization_requests.clone()
    }

    /// Returns the identifiers of deleted subscriptions.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.state).deleted.clone()
    }

    /// Locks the state and fails when a failure is scripted.
    fn checked_state(&self) -> Result<MutexGuard<'_, AccountsState>, UpstreamError> {
        let state = lock(&self.state);
        match &state.failure {
            Some(error) => Err(error.clone()),
            None => Ok(state),
        }
    }
}

/// Builds the not-found error for an accounts-system record.
fn not_found(what: &str, id: &str) -> UpstreamError {
    UpstreamError::Client {
        service: ACCOUNTS_SERVICE,
        status: STATUS_NOT_FOUND,
        message: format!("{what} '{id}' not found"),
    }
}

#[async_trait]
impl AccountsService for InMemoryAccounts {
    async fn get_quota_cost(
        &self,
        ams_org_id: &str,
        search: &str,
    ) -> Result<Option<QuotaCost>, UpstreamError> {
        let mut state = self.checked_state()?;
        state.quota_searches.push((ams_org_id.to_string(), search.to_string()));
        Ok(state.quotas.get(ams_org_id).cloned())
    }

    async fn get_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, UpstreamError> {
        let mut state = self.checked_state()?;
        state.subscription_queries.push(query.clone());
        let size = usize::try_from(query.size).unwrap_or(usize::MAX);
        let skip = usize::try_from(query.page.saturating_sub(1))
            .unwrap_or(usize::MAX)
            .saturating_mul(size);
        Ok(state.subscriptions.values().skip(skip).take(size).cloned().collect())
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, UpstreamError> {
        let state = self.checked_state()?;
        state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| not_found("subscription", subscription_id))
    }

    async fn delete_subscription(&self, subscription_id: &str) -> Result<(), UpstreamError> {
        let mut state = self.checked_state()?;
        let removed = state.subscriptions.remove(subscription_id);
        let Some(subscription) = removed else {
            return Err(not_found("subscription", subscription_id));
        };
        if let Some(org) = subscription.organization_id.as_deref()
            && let Some(quota) = state.quotas.get_mut(org)
        {
            quota.consumed = quota.consumed.saturating_sub(1).max(0);
        }
        state.deleted.push(subscription_id.to_string());
        Ok(())
    }

    async fn quota_authorization(
        &self,
        request: &QuotaAuthorizationRequest,
    ) -> Result<QuotaAuthorization, UpstreamError> {
        let mut state = self.checked_state()?;
        state.authorization_requests.push(request.clone());
        if let Some(authorization) = state.scripted_authorization.clone() {
            return Ok(authorization);
        }
        let matched = state
            .quotas
            .iter()
            .find(|(_, quota)| {
                quota.version.is_some() && quota.version.as_deref() == request.quota_version.as_deref()
            })
            .map(|(org, _)| org.clone());
        let Some(org) = matched else {
            return Ok(QuotaAuthorization::default());
        };
        let exhausted = state.quotas.get(&org).is_none_or(|quota| quota.consumed >= quota.allowed);
        if exhausted {
            return Ok(QuotaAuthorization {
                allowed: false,
                excess_resources: request.resources.len().max(1),
                subscription_id: None,
            });
        }
        if let Some(quota) = state.quotas.get_mut(&org) {
            quota.consumed += 1;
        }
        state.next_subscription += 1;
        let subscription_id = format!("sub-{}", state.next_subscription);
        state.subscriptions.insert(subscription_id.clone(), Subscription {
            id: subscription_id.clone(),
            organization_id: Some(org),
            status: "Active".to_string(),
            creator: Some(SubscriptionCreator {
                username: Some(request.account_username.clone()),
                ..SubscriptionCreator::default()
            }),
        });
        Ok(QuotaAuthorization {
            allowed: true,
            excess_resources: 0,
            subscription_id: Some(subscription_id),
        })
    }

    async fn convert_user_org_id(&self, org_id: &str) -> Result<String, UpstreamError> {
        let state = self.checked_state()?;
        if let Some(mapped) = state.org_mappings.get(org_id) {
            return Ok(mapped.clone());
        }
        if !is_valid_id(org_id) {
            return Err(not_found("organization", org_id));
        }
        Ok(format!("{AMS_ORG_PREFIX}{org_id}"))
    }
}

// ============================================================================
// SECTION: User Directory
// ============================================================================

/// User directory over in-memory records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    /// Users by login.
    users: Arc<Mutex<BTreeMap<String, DirectoryUser>>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user.
    #[must_use]
    pub fn with_user(self, user: DirectoryUser) -> Self {
        lock(&self.users).insert(user.username.clone(), user);
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_user(&self, username: &str) -> Result<DirectoryUser, UpstreamError> {
        lock(&self.users).get(username).cloned().ok_or_else(|| UpstreamError::Directory {
            status: STATUS_NOT_FOUND,
            message: format!("user '{username}' not found"),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks a mutex, recovering the data from a poisoned lock.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
