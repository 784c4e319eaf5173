// crates/entitlements-core/src/runtime/errors.rs
// ============================================================================
// Module: Error Translator
// Description: Seat errors and their uniform wire-level error envelope.
// Purpose: Map upstream and local failures onto one caller-facing shape.
// Dependencies: crate::interfaces, serde, thiserror
// ============================================================================

//! ## Overview
//! Seat operations fail with [`SeatError`]. The [`ErrorTranslator`] turns
//! those failures, and bare [`UpstreamError`] values, into an
//! [`ErrorEnvelope`]. Structured upstream API errors keep their code,
//! identifier, operation id and status; `ACCT-MGMT-11` denials can be
//! augmented with an operator-authored sentence. Translation has no side
//! effects; callers log the envelope.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::interfaces::UpstreamError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Accounts-system code for a user outside the caller's quota scope.
pub const ACCT_MGMT_11: &str = "ACCT-MGMT-11";
/// HTTP 400.
const STATUS_BAD_REQUEST: u16 = 400;
/// HTTP 403.
const STATUS_FORBIDDEN: u16 = 403;
/// HTTP 409.
const STATUS_CONFLICT: u16 = 409;
/// HTTP 500.
pub const STATUS_INTERNAL: u16 = 500;

// ============================================================================
// SECTION: Seat Errors
// ============================================================================

/// Seat manager failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatError {
    /// Caller input is invalid.
    #[error("{0}")]
    BadRequest(String),
    /// Caller may not perform the operation.
    #[error("{0}")]
    Forbidden(String),
    /// Quota is exhausted.
    #[error("{0}")]
    Conflict(String),
    /// Upstream data is inconsistent.
    #[error("{0}")]
    Internal(String),
    /// Upstream collaborator failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Uniform error body returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable message.
    pub error: String,
    /// Upstream error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Upstream error identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Upstream operation identifier.
    #[serde(default, rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// HTTP status.
    pub status: u16,
}

impl ErrorEnvelope {
    /// Builds an envelope carrying only a message and status.
    #[must_use]
    pub fn new(status: u16, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            identifier: None,
            operation_id: None,
            status,
        }
    }

    /// Returns true for server-side failures.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.status >= STATUS_INTERNAL
    }
}

// ============================================================================
// SECTION: Translator
// ============================================================================

/// Maps errors to [`ErrorEnvelope`] values.
#[derive(Debug, Clone, Default)]
pub struct ErrorTranslator {
    /// Sentence appended to `ACCT-MGMT-11` forbidden messages.
    acct_mgmt_11_message: Option<String>,
}

impl ErrorTranslator {
    /// Creates a translator; blank hint text is treated as absent.
    #[must_use]
    pub fn new(acct_mgmt_11_message: Option<String>) -> Self {
        Self {
            acct_mgmt_11_message: acct_mgmt_11_message
                .map(|message| message.trim().to_string())
                .filter(|message| !message.is_empty()),
        }
    }

    /// Translates a seat manager error.
    #[must_use]
    pub fn translate_seat(&self, err: &SeatError) -> ErrorEnvelope {
        match err {
            SeatError::BadRequest(message) => ErrorEnvelope::new(STATUS_BAD_REQUEST, message),
            SeatError::Forbidden(message) => ErrorEnvelope::new(STATUS_FORBIDDEN, message),
            SeatError::Conflict(message) => ErrorEnvelope::new(STATUS_CONFLICT, message),
            SeatError::Internal(message) => ErrorEnvelope::new(STATUS_INTERNAL, message),
            SeatError::Upstream(err) => self.translate_upstream(err, STATUS_INTERNAL),
        }
    }

    /// Translates an upstream error, using `default_status` for failures
    /// that carry no upstream status.
    #[must_use]
    pub fn translate_upstream(&self, err: &UpstreamError, default_status: u16) -> ErrorEnvelope {
        match err {
            UpstreamError::Api {
                status,
                code,
                identifier,
                operation_id,
                reason,
                ..
            } => {
                let error = match &self.acct_mgmt_11_message {
                    Some(hint) if code == ACCT_MGMT_11 && *status == STATUS_FORBIDDEN => {
                        format!("{reason} {hint}")
                    }
                    _ => reason.clone(),
                };
                ErrorEnvelope {
                    error,
                    code: Some(code.clone()),
                    identifier: identifier.clone(),
                    operation_id: operation_id.clone(),
                    status: *status,
                }
            }
            UpstreamError::Client {
                status,
                message,
                ..
            }
            | UpstreamError::Directory {
                status,
                message,
            } => ErrorEnvelope::new(*status, message),
            UpstreamError::Timeout {
                ..
            }
            | UpstreamError::Transport {
                ..
            }
            | UpstreamError::Decode {
                ..
            } => ErrorEnvelope::new(default_status, err.to_string()),
        }
    }
}
