// crates/entitlements-providers/src/ams.rs
// ============================================================================
// Module: Accounts Client
// Description: HTTP client for the accounts/quota system of record.
// Purpose: Implement seat subscriptions, quota, and org conversion over HTTP.
// Dependencies: entitlements-core, reqwest, serde, tokio, url
// ============================================================================

//! ## Overview
//! The accounts system exposes subscriptions, quota cost, quota
//! authorizations and organizations under `/api/accounts_mgmt/v1`. Requests
//! carry an OAuth2 bearer token obtained with the client-credentials grant;
//! the token is cached until shortly before it expires.
//!
//! Non-success responses carrying a structured error body (`code`, `id`,
//! `reason`, `operation_id`) map to `UpstreamError::Api` so the error
//! translator can recognize known codes such as `ACCT-MGMT-11`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use entitlements_core::AccountsService;
use entitlements_core::QuotaAuthorization;
use entitlements_core::QuotaAuthorizationRequest;
use entitlements_core::QuotaCost;
use entitlements_core::Subscription;
use entitlements_core::SubscriptionQuery;
use entitlements_core::UpstreamError;
use reqwest::Client;
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use url::Url;
use url::form_urlencoded;

use crate::http::decode_json;
use crate::http::is_success;
use crate::http::read_response;
use crate::http::request_error;
use crate::http::status_error;
use crate::tls::ProviderInitError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Service label used in errors and metrics.
pub const ACCOUNTS_SERVICE: &str = "accounts";
/// Path segments of the accounts API root.
const API_ROOT: [&str; 3] = ["api", "accounts_mgmt", "v1"];
/// Token lifetime assumed when the issuer omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);
/// Tokens are refreshed this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
/// HTTP 400.
const STATUS_BAD_REQUEST: u16 = 400;
/// HTTP 404.
const STATUS_NOT_FOUND: u16 = 404;

// ============================================================================
// SECTION: Types
// ============================================================================

/// OAuth2 client credentials for the accounts system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsCredentials {
    /// OAuth2 client identifier.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// OAuth2 token endpoint.
    pub token_url: String,
}

/// Cached bearer token.
#[derive(Debug, Clone)]
struct CachedToken {
    /// Bearer token value.
    access_token: String,
    /// Instant after which the token is refreshed.
    refresh_at: Instant,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /// Bearer token value.
    access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Collection response envelope.
#[derive(Debug, Deserialize)]
struct ItemList<T> {
    /// Items of the page.
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Structured error body returned by the accounts system.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    /// Error identifier.
    #[serde(default)]
    id: Option<String>,
    /// Error code, e.g. `ACCT-MGMT-11`.
    #[serde(default)]
    code: Option<String>,
    /// Human-readable reason.
    #[serde(default)]
    reason: Option<String>,
    /// Operation identifier for support correlation.
    #[serde(default)]
    operation_id: Option<String>,
}

/// Quota authorization response.
#[derive(Debug, Deserialize)]
struct QuotaAuthorizationResponse {
    /// Authorization granted.
    #[serde(default)]
    allowed: bool,
    /// Resources exceeding the quota.
    #[serde(default)]
    excess_resources: Vec<serde_json::Value>,
    /// Subscription created by the authorization.
    #[serde(default)]
    subscription: Option<SubscriptionRef>,
}

/// Reference to a subscription.
#[derive(Debug, Deserialize)]
struct SubscriptionRef {
    /// Subscription identifier.
    id: String,
}

/// Organization record.
#[derive(Debug, Deserialize)]
struct Organization {
    /// Accounts-system org identifier.
    id: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Accounts/quota system client over HTTP.
pub struct AmsClient {
    /// Shared outbound client.
    client: Client,
    /// Accounts-system base URL.
    host: Url,
    /// Client credentials; requests are unauthenticated without them.
    credentials: Option<AmsCredentials>,
    /// Cached bearer token.
    token: Mutex<Option<CachedToken>>,
}

impl AmsClient {
    /// Creates a client for the accounts system at `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderInitError::Client`] when `host` is not a base URL.
    pub fn new(
        client: Client,
        host: &str,
        credentials: Option<AmsCredentials>,
    ) -> Result<Self, ProviderInitError> {
        let host = Url::parse(host)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ProviderInitError::Client(format!("invalid accounts host {host}")))?;
        Ok(Self {
            client,
            host,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Builds an API URL from path segments below the API root.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, UpstreamError> {
        let mut url = self.host.clone();
        url.path_segments_mut()
            .map_err(|()| UpstreamError::Transport {
                service: ACCOUNTS_SERVICE,
                message: "accounts host is not a base url".to_string(),
            })?
            .pop_if_empty()
            .extend(API_ROOT)
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Returns a valid bearer token, refreshing it when needed.
    async fn bearer_token(&self) -> Result<Option<String>, UpstreamError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(Some(token.access_token.clone()));
        }

        debug!("requesting accounts access token");
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &credentials.client_id)
            .append_pair("client_secret", &credentials.client_secret)
            .finish();
        let response = self
            .client
            .post(&credentials.token_url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|err| request_error(ACCOUNTS_SERVICE, &err))?;
        let (status, body) = read_response(ACCOUNTS_SERVICE, response).await?;
        if !is_success(status) {
            return Err(status_error(ACCOUNTS_SERVICE, status, &body));
        }
        let token: TokenResponse = decode_json(ACCOUNTS_SERVICE, &body)?;
        let lifetime = token.expires_in.map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        });
        Ok(Some(token.access_token))
    }

    /// Sends an authenticated request and returns status and body.
    async fn send(&self, request: RequestBuilder) -> Result<(u16, Vec<u8>), UpstreamError> {
        let request = match self.bearer_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(|err| request_error(ACCOUNTS_SERVICE, &err))?;
        read_response(ACCOUNTS_SERVICE, response).await
    }

    /// Sends a request and decodes a successful JSON response.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, UpstreamError> {
        let (status, body) = self.send(request).await?;
        if !is_success(status) {
            return Err(api_error(status, &body));
        }
        decode_json(ACCOUNTS_SERVICE, &body)
    }
}

#[async_trait]
impl AccountsService for AmsClient {
    async fn get_quota_cost(
        &self,
        ams_org_id: &str,
        search: &str,
    ) -> Result<Option<QuotaCost>, UpstreamError> {
        let url =
            self.endpoint(&["organizations", ams_org_id, "quota_cost"], &[("search", search)])?;
        let list: ItemList<QuotaCost> = self.send_json(self.client.get(url)).await?;
        Ok(list.items.into_iter().next())
    }

    async fn get_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, UpstreamError> {
        let page = query.page.to_string();
        let size = query.size.to_string();
        let url = self.endpoint(&["subscriptions"], &[
            ("search", query.search.as_str()),
            ("page", page.as_str()),
            ("size", size.as_str()),
            ("fetchAccounts", "true"),
        ])?;
        let list: ItemList<Subscription> = self.send_json(self.client.get(url)).await?;
        Ok(list.items)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, UpstreamError> {
        let url =
            self.endpoint(&["subscriptions", subscription_id], &[("fetchAccounts", "true")])?;
        self.send_json(self.client.get(url)).await
    }

    async fn delete_subscription(&self, subscription_id: &str) -> Result<(), UpstreamError> {
        let url = self.endpoint(&["subscriptions", subscription_id], &[])?;
        let (status, body) = self.send(self.client.delete(url)).await?;
        if !is_success(status) {
            return Err(api_error(status, &body));
        }
        Ok(())
    }

    async fn quota_authorization(
        &self,
        request: &QuotaAuthorizationRequest,
    ) -> Result<QuotaAuthorization, UpstreamError> {
        let url = self.endpoint(&["quota_authorizations"], &[])?;
        let response: QuotaAuthorizationResponse =
            self.send_json(self.client.post(url).json(request)).await?;
        Ok(QuotaAuthorization {
            allowed: response.allowed,
            excess_resources: response.excess_resources.len(),
            subscription_id: response.subscription.map(|subscription| subscription.id),
        })
    }

    async fn convert_user_org_id(&self, org_id: &str) -> Result<String, UpstreamError> {
        if org_id.contains('\'') {
            return Err(UpstreamError::Client {
                service: ACCOUNTS_SERVICE,
                status: STATUS_BAD_REQUEST,
                message: "org id must not contain quotes".to_string(),
            });
        }
        let search = format!("external_id='{org_id}'");
        let url = self.endpoint(&["organizations"], &[("search", search.as_str())])?;
        let list: ItemList<Organization> = self.send_json(self.client.get(url)).await?;
        list.items.into_iter().next().map(|organization| organization.id).ok_or_else(|| {
            UpstreamError::Client {
                service: ACCOUNTS_SERVICE,
                status: STATUS_NOT_FOUND,
                message: format!("organization {org_id} not found"),
            }
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a non-success response to an upstream error.
fn api_error(status: u16, body: &[u8]) -> UpstreamError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            id,
            code: Some(code),
            reason,
            operation_id,
        }) => UpstreamError::Api {
            service: ACCOUNTS_SERVICE,
            status,
            code,
            identifier: id,
            operation_id,
            reason: reason.unwrap_or_default(),
        },
        _ => status_error(ACCOUNTS_SERVICE, status, body),
    }
}
