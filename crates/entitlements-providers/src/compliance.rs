// crates/entitlements-providers/src/compliance.rs
// ============================================================================
// Module: Compliance Client
// Description: HTTP client for the export-screening service.
// Purpose: Relay screening verdicts for a user.
// Dependencies: entitlements-core, reqwest, serde, serde_json, url
// ============================================================================

//! ## Overview
//! Screening requests go to `POST {host}/v1/screening`. The upstream status
//! and JSON body are relayed unchanged; only unreachable upstreams and
//! non-JSON bodies are errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use entitlements_core::ComplianceScreener;
use entitlements_core::ScreeningRequest;
use entitlements_core::ScreeningResult;
use entitlements_core::UpstreamError;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::http::build_url;
use crate::http::decode_json;
use crate::http::read_response;
use crate::http::request_error;
use crate::tls::ProviderInitError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Service label used in errors.
pub const COMPLIANCE_SERVICE: &str = "compliance";
/// Screening path.
const SCREENING_PATH: &str = "/v1/screening";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Screening request body.
#[derive(Debug, Serialize)]
struct ScreeningBody<'a> {
    /// User being screened.
    user: ScreeningUser<'a>,
    /// Account of the user.
    account: ScreeningAccount<'a>,
}

/// User section of the screening body.
#[derive(Debug, Serialize)]
struct ScreeningUser<'a> {
    /// User login.
    login: &'a str,
}

/// Account section of the screening body.
#[derive(Debug, Serialize)]
struct ScreeningAccount<'a> {
    /// Primary email of the user.
    primary_email: &'a str,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Export-screening client over HTTP.
pub struct ComplianceClient {
    /// Shared outbound client.
    client: Client,
    /// Screening endpoint.
    endpoint: Url,
}

impl ComplianceClient {
    /// Creates a screening client for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderInitError::Client`] when the endpoint URL is invalid.
    pub fn new(client: Client, host: &str) -> Result<Self, ProviderInitError> {
        Ok(Self {
            client,
            endpoint: build_url(COMPLIANCE_SERVICE, host, SCREENING_PATH, &[])
                .map_err(|err| ProviderInitError::Client(err.to_string()))?,
        })
    }
}

#[async_trait]
impl ComplianceScreener for ComplianceClient {
    async fn screen(&self, request: &ScreeningRequest) -> Result<ScreeningResult, UpstreamError> {
        let body = ScreeningBody {
            user: ScreeningUser {
                login: &request.login,
            },
            account: ScreeningAccount {
                primary_email: &request.email,
            },
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|err| request_error(COMPLIANCE_SERVICE, &err))?;
        let (status, body) = read_response(COMPLIANCE_SERVICE, response).await?;
        let body: Value = decode_json(COMPLIANCE_SERVICE, &body)?;
        Ok(ScreeningResult {
            status,
            body,
        })
    }
}
