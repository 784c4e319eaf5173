// crates/entitlements-api/src/error.rs
// ============================================================================
// Module: API Errors
// Description: HTTP rendering of error envelopes.
// Purpose: Give every failed request the same JSON body and log it once.
// Dependencies: axum, entitlements-core, tracing
// ============================================================================

//! ## Overview
//! Handlers fail with [`ApiError`], a thin wrapper over the core
//! [`ErrorEnvelope`]. Rendering logs the envelope: server-side failures at
//! `error`, caller mistakes at `debug`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use entitlements_core::ErrorEnvelope;
use tracing::debug;
use tracing::error;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Failed request carrying its wire envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError(pub ErrorEnvelope);

impl ApiError {
    /// Builds a `400` error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(ErrorEnvelope::new(StatusCode::BAD_REQUEST.as_u16(), message))
    }

    /// Builds a `500` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self(ErrorEnvelope::new(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), message))
    }

    /// Returns the HTTP status of the envelope.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ErrorEnvelope> for ApiError {
    fn from(envelope: ErrorEnvelope) -> Self {
        Self(envelope)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = &self.0;
        if envelope.is_internal() {
            error!(
                status = envelope.status,
                code = envelope.code.as_deref(),
                operation_id = envelope.operation_id.as_deref(),
                error = %envelope.error,
                "request failed"
            );
        } else {
            debug!(
                status = envelope.status,
                code = envelope.code.as_deref(),
                error = %envelope.error,
                "request rejected"
            );
        }
        (self.status(), Json(self.0)).into_response()
    }
}
