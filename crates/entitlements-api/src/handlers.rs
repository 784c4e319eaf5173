// crates/entitlements-api/src/handlers.rs
// ============================================================================
// Module: Handlers
// Description: axum handlers for the entitlements HTTP surface.
// Purpose: Translate HTTP requests into evaluator and seat manager calls.
// Dependencies: axum, entitlements-core, serde_json, tokio, url
// ============================================================================

//! ## Overview
//! Handlers parse query strings and bodies, call into `entitlements-core`,
//! and shape the responses. `/services` never fails on upstream trouble: it
//! answers `200` and flags the degradation through response headers. Seat
//! and compliance failures go through the error translator.
//!
//! Query strings are parsed from the raw query so that repeated parameters
//! such as `status` are preserved.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use entitlements_core::AssignSeatRequest;
use entitlements_core::AssignedSeat;
use entitlements_core::BundleFilter;
use entitlements_core::EvaluationRequest;
use entitlements_core::ListSeatsRequest;
use entitlements_core::PrincipalType;
use entitlements_core::ScreeningRequest;
use entitlements_core::SeatError;
use entitlements_core::SeatPage;
use entitlements_core::UpstreamError;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::identity::CallerIdentity;
use crate::state::AppState;
use crate::state::ServiceStatus;
use crate::telemetry::CacheOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header flagging a fail-closed entitlement answer.
pub const DEGRADED_HEADER: &str = "x-entitlements-degraded";
/// Header carrying the upstream status behind a fail-closed answer.
pub const DEGRADED_STATUS_HEADER: &str = "x-entitlements-degraded-status";
/// Service label of the feature-status upstream.
const FEATURE_STATUS_SERVICE: &str = "feature-status";
/// Content type of the Prometheus text exposition.
const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

// ============================================================================
// SECTION: Query Parsing
// ============================================================================

/// Parsed `/services` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ServicesQuery {
    /// Comma-separated include filter.
    include: Option<String>,
    /// Comma-separated exclude filter.
    exclude: Option<String>,
    /// Bypass cached positive snapshots.
    trial_activated: bool,
}

/// Parses the `/services` query; repeated filter parameters are joined.
fn parse_services_query(query: Option<&str>) -> ServicesQuery {
    let mut parsed = ServicesQuery::default();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "include_bundles" => append_csv(&mut parsed.include, &value),
            "exclude_bundles" => append_csv(&mut parsed.exclude, &value),
            "trial_activated" => {
                parsed.trial_activated =
                    value.eq_ignore_ascii_case("true") || value.as_ref() == "1";
            }
            _ => {}
        }
    }
    parsed
}

/// Appends `value` to a comma-separated list.
fn append_csv(target: &mut Option<String>, value: &str) {
    match target {
        Some(existing) => {
            existing.push(',');
            existing.push_str(value);
        }
        None => *target = Some(value.to_string()),
    }
}

/// Parses the `/seats` listing query.
fn parse_seats_query(query: Option<&str>) -> Result<ListSeatsRequest, ApiError> {
    let mut request = ListSeatsRequest::default();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "limit" => request.limit = parse_integer("limit", &value)?,
            "offset" => request.offset = parse_integer("offset", &value)?,
            "status" if !value.trim().is_empty() => request.statuses.push(value.into_owned()),
            _ => {}
        }
    }
    Ok(request)
}

/// Parses an integer query parameter.
fn parse_integer(name: &str, value: &str) -> Result<i64, ApiError> {
    value.trim().parse().map_err(|_| ApiError::bad_request(format!("{name} must be an integer")))
}

// ============================================================================
// SECTION: Entitlements
// ============================================================================

/// `GET /api/entitlements/v1/services`.
pub async fn handle_services(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    RawQuery(query): RawQuery,
) -> Response {
    let params = parse_services_query(query.as_deref());
    let request = EvaluationRequest {
        identity,
        filter: BundleFilter::from_csv(params.include.as_deref(), params.exclude.as_deref()),
        force_fresh: params.trial_activated,
    };
    let evaluation = state.evaluator.evaluate(&request).await;

    if !state.evaluator.entitle_all() {
        let outcome = if evaluation.cache_hit {
            CacheOutcome::Hit
        } else if evaluation.is_degraded() {
            state.metrics.record_upstream_error(FEATURE_STATUS_SERVICE);
            CacheOutcome::FailClosed
        } else {
            CacheOutcome::Miss
        };
        state.metrics.record_cache(outcome);
    }

    let mut response = Json(&evaluation.decisions).into_response();
    if let Some(status) = evaluation.degraded_status {
        state.metrics.record_degraded();
        let headers = response.headers_mut();
        headers.insert(HeaderName::from_static(DEGRADED_HEADER), HeaderValue::from_static("true"));
        headers.insert(HeaderName::from_static(DEGRADED_STATUS_HEADER), HeaderValue::from(status));
    }
    response
}

// ============================================================================
// SECTION: Seats
// ============================================================================

/// `GET /api/entitlements/v1/seats`.
pub async fn handle_list_seats(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    RawQuery(query): RawQuery,
) -> Result<Json<SeatPage>, ApiError> {
    let request = parse_seats_query(query.as_deref())?;
    state
        .seats
        .list_seats(&identity, &request)
        .await
        .map(Json)
        .map_err(|err| seat_error(&state, &err))
}

/// `POST /api/entitlements/v1/seats`.
pub async fn handle_assign_seat(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    body: Bytes,
) -> Result<Json<AssignedSeat>, ApiError> {
    let request: AssignSeatRequest = serde_json::from_slice(&body)
        .map_err(|err| ApiError::bad_request(format!("invalid seat request: {err}")))?;
    state
        .seats
        .assign_seat(&identity, &request)
        .await
        .map(Json)
        .map_err(|err| seat_error(&state, &err))
}

/// `DELETE /api/entitlements/v1/seats/{id}`.
pub async fn handle_revoke_seat(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
    Path(subscription_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .seats
        .revoke_seat(&identity, &subscription_id)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|err| seat_error(&state, &err))
}

/// Translates a seat failure, counting upstream errors.
fn seat_error(state: &AppState, err: &SeatError) -> ApiError {
    if let SeatError::Upstream(upstream) = err {
        state.metrics.record_upstream_error(upstream.service());
    }
    ApiError(state.translator.translate_seat(err))
}

/// Translates an upstream failure, counting it.
fn upstream_error(state: &AppState, err: &UpstreamError) -> ApiError {
    state.metrics.record_upstream_error(err.service());
    ApiError(state.translator.translate_upstream(err, StatusCode::INTERNAL_SERVER_ERROR.as_u16()))
}

// ============================================================================
// SECTION: Compliance
// ============================================================================

/// `GET /api/entitlements/v1/compliance`.
pub async fn handle_compliance(
    State(state): State<AppState>,
    CallerIdentity(identity): CallerIdentity,
) -> Result<Response, ApiError> {
    if identity.principal_type == PrincipalType::ServiceAccount {
        return Err(ApiError::bad_request("service accounts cannot be screened"));
    }
    if identity.username.is_empty() {
        return Err(ApiError::bad_request("identity has no username"));
    }
    let Some(screener) = &state.compliance else {
        return Err(ApiError::internal("compliance screening is not configured"));
    };
    let result = screener
        .screen(&ScreeningRequest {
            login: identity.username,
            email: identity.email,
        })
        .await
        .map_err(|err| upstream_error(&state, &err))?;
    let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(result.body)).into_response())
}

// ============================================================================
// SECTION: Service Endpoints
// ============================================================================

/// `GET /status`.
pub async fn handle_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.status.clone())
}

/// `GET /api/entitlements/v1/openapi.json`.
pub async fn handle_openapi(State(state): State<AppState>) -> Result<Response, ApiError> {
    let document = tokio::fs::read(&state.openapi_path).await.map_err(|err| {
        ApiError::internal(format!(
            "openapi document {} unavailable: {err}",
            state.openapi_path.display()
        ))
    })?;
    Ok(([(CONTENT_TYPE, "application/json")], document).into_response())
}

/// `GET /metrics`.
pub async fn handle_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state.metrics.render().map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(([(CONTENT_TYPE, METRICS_CONTENT_TYPE)], text).into_response())
}

#[cfg(test)]
mod tests;
