// crates/entitlements-providers/src/http.rs
// ============================================================================
// Module: HTTP Helpers
// Description: Shared request error classification and body decoding.
// Purpose: Map reqwest outcomes onto upstream error variants consistently.
// Dependencies: entitlements-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! Helpers used by every client. A reqwest timeout maps to
//! `UpstreamError::Timeout`; other send failures map to `Transport`;
//! undecodable bodies map to `Decode`.
//!
//! Response bodies are read in chunks and capped at [`MAX_RESPONSE_BYTES`];
//! larger bodies fail with `Decode` before they are fully buffered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use entitlements_core::UpstreamError;
use reqwest::Response;
use serde::de::DeserializeOwned;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted upstream response body size in bytes.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Maximum number of body characters carried into error messages.
const MAX_ERROR_BODY_CHARS: usize = 512;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Classifies a reqwest failure for `service`.
pub(crate) fn request_error(service: &'static str, err: &reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout {
            service,
        }
    } else if err.is_decode() {
        UpstreamError::Decode {
            service,
            message: err.to_string(),
        }
    } else {
        UpstreamError::Transport {
            service,
            message: err.to_string(),
        }
    }
}

/// Reads the status and the body of a response, bounded by
/// [`MAX_RESPONSE_BYTES`].
pub(crate) async fn read_response(
    service: &'static str,
    response: Response,
) -> Result<(u16, Vec<u8>), UpstreamError> {
    let status = response.status().as_u16();
    let body = read_response_limited(service, response, MAX_RESPONSE_BYTES).await?;
    Ok((status, body))
}

/// Reads a response body chunk by chunk, failing once it exceeds `max_bytes`.
async fn read_response_limited(
    service: &'static str,
    mut response: Response,
    max_bytes: usize,
) -> Result<Vec<u8>, UpstreamError> {
    let declared = response.content_length().and_then(|len| usize::try_from(len).ok());
    if declared.is_some_and(|len| len > max_bytes) {
        return Err(size_limit_error(service, max_bytes));
    }
    let mut body = Vec::with_capacity(declared.unwrap_or_default());
    while let Some(chunk) = response.chunk().await.map_err(|err| request_error(service, &err))? {
        if body.len().saturating_add(chunk.len()) > max_bytes {
            return Err(size_limit_error(service, max_bytes));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Builds the error for an oversized response body.
fn size_limit_error(service: &'static str, max_bytes: usize) -> UpstreamError {
    UpstreamError::Decode {
        service,
        message: format!("response body exceeds {max_bytes} bytes"),
    }
}

/// Decodes a JSON body.
pub(crate) fn decode_json<T: DeserializeOwned>(
    service: &'static str,
    body: &[u8],
) -> Result<T, UpstreamError> {
    serde_json::from_slice(body).map_err(|err| UpstreamError::Decode {
        service,
        message: err.to_string(),
    })
}

/// Returns true for 2xx statuses.
pub(crate) fn is_success(status: u16) -> bool {
    (200 .. 300).contains(&status)
}

/// Renders a body for an error message, bounded in length.
pub(crate) fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Builds a non-success error without a structured body.
pub(crate) fn status_error(service: &'static str, status: u16, body: &[u8]) -> UpstreamError {
    UpstreamError::Client {
        service,
        status,
        message: body_excerpt(body),
    }
}

/// Joins a base URL and a path, then appends query pairs.
pub(crate) fn build_url(
    service: &'static str,
    base: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Url, UpstreamError> {
    let joined = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    let mut url = Url::parse(&joined).map_err(|err| UpstreamError::Transport {
        service,
        message: format!("invalid url {joined}: {err}"),
    })?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}
