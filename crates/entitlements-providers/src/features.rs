// crates/entitlements-providers/src/features.rs
// ============================================================================
// Module: Feature-Status Client
// Description: HTTP client for the upstream feature-status endpoint.
// Purpose: Fetch an organization's feature snapshot for SKU-based bundles.
// Dependencies: entitlements-core, reqwest, url
// ============================================================================

//! ## Overview
//! The request URL is fixed at startup: the `features` query repeats once per
//! SKU-based bundle in the registry, so attribute-only bundles never reach
//! the upstream. Each fetch appends the caller's org id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use entitlements_core::FeatureSnapshot;
use entitlements_core::FeatureStatusSource;
use entitlements_core::UpstreamError;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::http::build_url;
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
pub const FEATURE_STATUS_SERVICE: &str = "feature-status";
/// Endpoint below the configured base path.
const FEATURE_STATUS_ENDPOINT: &str = "featureStatus";
/// Query parameter carrying the org id.
const ORG_QUERY_PARAM: &str = "accountId";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Feature-status client over HTTP.
pub struct HttpFeatureStatus {
    /// Shared outbound client.
    client: Client,
    /// Endpoint URL including the `features` query.
    endpoint: Url,
}

impl HttpFeatureStatus {
    /// Creates a client querying `features` at `{host}{base_path}/featureStatus`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderInitError::Client`] when the URL is invalid.
    pub fn new(
        client: Client,
        host: &str,
        base_path: &str,
        features: &[String],
    ) -> Result<Self, ProviderInitError> {
        let path = format!("{}/{FEATURE_STATUS_ENDPOINT}", base_path.trim_end_matches('/'));
        let pairs: Vec<(&str, &str)> =
            features.iter().map(|feature| ("features", feature.as_str())).collect();
        let endpoint = build_url(FEATURE_STATUS_SERVICE, host, &path, &pairs)
            .map_err(|err| ProviderInitError::Client(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
        })
    }

    /// Returns the endpoint URL without the org id.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl FeatureStatusSource for HttpFeatureStatus {
    async fn fetch(&self, org_id: &str) -> Result<FeatureSnapshot, UpstreamError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair(ORG_QUERY_PARAM, org_id);
        debug!(org_id, "fetching feature status");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| request_error(FEATURE_STATUS_SERVICE, &err))?;
        let (status, body) = read_response(FEATURE_STATUS_SERVICE, response).await?;
        if !is_success(status) {
            return Err(status_error(FEATURE_STATUS_SERVICE, status, &body));
        }
        decode_json(FEATURE_STATUS_SERVICE, &body)
    }
}
