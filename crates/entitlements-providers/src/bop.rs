// crates/entitlements-providers/src/bop.rs
// ============================================================================
// Module: User Directory Client
// Description: HTTP client for the user directory.
// Purpose: Resolve a login to its org, email, and admin flag.
// Dependencies: entitlements-core, reqwest, serde, url
// ============================================================================

//! ## Overview
//! The directory resolves logins through `POST {url}/v3/users` with a body
//! of `{"users": [login]}`. Requests authenticate with an API token and a
//! client id and name the target environment. An empty result means the user
//! does not exist and maps to a directory `404`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use entitlements_core::DirectoryUser;
use entitlements_core::UpstreamError;
use entitlements_core::UserDirectory;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::http::body_excerpt;
use crate::http::build_url;
use crate::http::decode_json;
use crate::http::is_success;
use crate::http::read_response;
use crate::http::request_error;
use crate::tls::ProviderInitError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Service label used in transport errors.
pub const DIRECTORY_SERVICE: &str = "user-directory";
/// Users lookup path.
const USERS_PATH: &str = "/v3/users";
/// API token header.
const HEADER_API_TOKEN: &str = "x-rh-apitoken";
/// Client id header.
const HEADER_CLIENT_ID: &str = "x-rh-clientid";
/// Environment header.
const HEADER_ENV: &str = "x-rh-insights-env";
/// HTTP 404.
const STATUS_NOT_FOUND: u16 = 404;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Users lookup body.
#[derive(Debug, Serialize)]
struct UsersRequest<'a> {
    /// Logins to resolve.
    users: [&'a str; 1],
}

/// User directory client over HTTP.
pub struct BopClient {
    /// Shared outbound client.
    client: Client,
    /// Users lookup endpoint.
    endpoint: Url,
    /// API token.
    token: String,
    /// Client id.
    client_id: String,
    /// Environment name.
    env: String,
}

impl BopClient {
    /// Creates a directory client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderInitError::Client`] when the endpoint URL is invalid.
    pub fn new(
        client: Client,
        base_url: &str,
        client_id: &str,
        token: &str,
        env: &str,
    ) -> Result<Self, ProviderInitError> {
        Ok(Self {
            client,
            endpoint: build_url(DIRECTORY_SERVICE, base_url, USERS_PATH, &[])
                .map_err(|err| ProviderInitError::Client(err.to_string()))?,
            token: token.to_string(),
            client_id: client_id.to_string(),
            env: env.to_string(),
        })
    }
}

#[async_trait]
impl UserDirectory for BopClient {
    async fn get_user(&self, username: &str) -> Result<DirectoryUser, UpstreamError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(HEADER_API_TOKEN, &self.token)
            .header(HEADER_CLIENT_ID, &self.client_id)
            .header(HEADER_ENV, &self.env)
            .json(&UsersRequest {
                users: [username],
            })
            .send()
            .await
            .map_err(|err| request_error(DIRECTORY_SERVICE, &err))?;
        let (status, body) = read_response(DIRECTORY_SERVICE, response).await?;
        if !is_success(status) {
            return Err(UpstreamError::Directory {
                status,
                message: body_excerpt(&body),
            });
        }
        let users: Vec<DirectoryUser> = decode_json(DIRECTORY_SERVICE, &body)?;
        users.into_iter().next().ok_or_else(|| UpstreamError::Directory {
            status: STATUS_NOT_FOUND,
            message: format!("user {username} not found"),
        })
    }
}
