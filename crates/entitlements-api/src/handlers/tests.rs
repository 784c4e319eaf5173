// crates/entitlements-api/src/handlers/tests.rs
// ============================================================================
// Module: Handler Tests
// Description: Unit tests for the HTTP handlers.
// Purpose: Validate status codes, bodies, and degraded headers end to end.
// Dependencies: entitlements-api, tempfile
// ============================================================================

//! ## Overview
//! Handlers are called directly with extractor values over the in-memory
//! fixture from `test_support`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions."
)]

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::RawQuery;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use entitlements_core::ComplianceScreener;
use entitlements_core::Identity;
use entitlements_core::PrincipalType;
use entitlements_core::ScreeningRequest;
use entitlements_core::ScreeningResult;
use entitlements_core::UpstreamError;
use serde_json::json;

use super::DEGRADED_HEADER;
use super::DEGRADED_STATUS_HEADER;
use super::handle_assign_seat;
use super::handle_compliance;
use super::handle_list_seats;
use super::handle_metrics;
use super::handle_openapi;
use super::handle_revoke_seat;
use super::handle_services;
use super::handle_status;
use super::parse_seats_query;
use super::parse_services_query;
use crate::identity::CallerIdentity;
use crate::telemetry::EntitlementsMetrics;
use crate::test_support::AMS_ORG_ID;
use crate::test_support::admin;
use crate::test_support::body_json;
use crate::test_support::fixture;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Wraps a raw query string.
fn query(value: &str) -> RawQuery {
    RawQuery(Some(value.to_string()))
}

/// Screener answering with a fixed verdict or failure.
struct FixedScreener {
    /// Result returned for every screening.
    outcome: Result<ScreeningResult, UpstreamError>,
}

#[async_trait]
impl ComplianceScreener for FixedScreener {
    async fn screen(&self, request: &ScreeningRequest) -> Result<ScreeningResult, UpstreamError> {
        assert_eq!(request.login, "admin");
        self.outcome.clone()
    }
}

// ============================================================================
// SECTION: Query Parsing
// ============================================================================

#[test]
fn services_query_joins_repeated_filters() {
    let parsed =
        parse_services_query(Some("include_bundles=A&include_bundles=B&trial_activated=TRUE"));
    assert_eq!(parsed.include.as_deref(), Some("A,B"));
    assert_eq!(parsed.exclude, None);
    assert!(parsed.trial_activated);
    assert!(!parse_services_query(None).trial_activated);
}

#[test]
fn seats_query_defaults_and_repeats() {
    let parsed = parse_seats_query(None).unwrap();
    assert_eq!((parsed.limit, parsed.offset), (10, 0));

    let parsed = parse_seats_query(Some("limit=5&offset=7&status=Active&status=&status=Inactive"))
        .unwrap();
    assert_eq!((parsed.limit, parsed.offset), (5, 7));
    assert_eq!(parsed.statuses, vec!["Active".to_string(), "Inactive".to_string()]);

    let err = parse_seats_query(Some("limit=ten")).unwrap_err();
    assert_eq!(err.0.status, 400);
    assert_eq!(err.0.error, "limit must be an integer");
}

// ============================================================================
// SECTION: Services
// ============================================================================

#[tokio::test]
async fn services_happy_path_has_no_degraded_headers() {
    let fixture = fixture(false);
    let response =
        handle_services(State(fixture.state), CallerIdentity(admin()), RawQuery(None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(DEGRADED_HEADER).is_none());
    assert_eq!(
        body_json(response).await,
        json!({
            "A": {"is_entitled": true, "is_trial": true},
            "B": {"is_entitled": true, "is_trial": false},
            "C": {"is_entitled": false, "is_trial": false}
        })
    );
}

#[tokio::test]
async fn services_degraded_answers_ok_with_headers() {
    let fixture = fixture(false);
    fixture.features.set_failure(Some(UpstreamError::Client {
        service: "feature-status",
        status: 503,
        message: "unavailable".to_string(),
    }));

    let response =
        handle_services(State(fixture.state), CallerIdentity(admin()), RawQuery(None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(DEGRADED_HEADER).unwrap(), "true");
    assert_eq!(response.headers().get(DEGRADED_STATUS_HEADER).unwrap(), "503");
    let body = body_json(response).await;
    assert_eq!(body["A"], json!({"is_entitled": false, "is_trial": false}));
    assert_eq!(body["B"], json!({"is_entitled": true, "is_trial": false}));

    let text = fixture.metrics.render().unwrap();
    assert!(text.contains("entitlements_degraded_responses_total 1"));
    assert!(text.contains("entitlements_feature_status_cache_total{outcome=\"fail_closed\"} 1"));
    assert!(text.contains("entitlements_upstream_errors_total{service=\"feature-status\"} 1"));
}

#[tokio::test]
async fn services_include_filter_limits_output() {
    let fixture = fixture(false);
    let response = handle_services(
        State(fixture.state),
        CallerIdentity(admin()),
        query("include_bundles=A&exclude_bundles=A,B"),
    )
    .await;

    let body = body_json(response).await;
    assert_eq!(body, json!({"A": {"is_entitled": true, "is_trial": true}}));
}

#[tokio::test]
async fn services_override_entitles_everything_without_upstream() {
    let fixture = fixture(true);
    let identity = Identity {
        account_number: "-1".to_string(),
        ..admin()
    };

    let response =
        handle_services(State(fixture.state), CallerIdentity(identity), RawQuery(None)).await;

    let body = body_json(response).await;
    for name in ["A", "B", "C"] {
        assert_eq!(body[name], json!({"is_entitled": true, "is_trial": false}));
    }
    assert_eq!(fixture.features.calls(), 0);
}

#[tokio::test]
async fn services_trial_activated_refetches() {
    let fixture = fixture(false);
    for _ in 0 .. 2 {
        let response = handle_services(
            State(fixture.state.clone()),
            CallerIdentity(admin()),
            query("trial_activated=true"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(fixture.features.calls(), 2);

    handle_services(State(fixture.state.clone()), CallerIdentity(admin()), RawQuery(None)).await;
    assert_eq!(fixture.features.calls(), 2);
    let text = fixture.metrics.render().unwrap();
    assert!(text.contains("entitlements_feature_status_cache_total{outcome=\"hit\"} 1"));
    assert!(text.contains("entitlements_feature_status_cache_total{outcome=\"miss\"} 2"));
}

// ============================================================================
// SECTION: Seats
// ============================================================================

#[tokio::test]
async fn list_seats_translates_offset_to_page() {
    let fixture = fixture(false);
    let page = handle_list_seats(
        State(fixture.state),
        CallerIdentity(admin()),
        query("limit=10&offset=25"),
    )
    .await
    .unwrap();

    let queries = fixture.accounts.subscription_queries();
    assert_eq!((queries[0].page, queries[0].size), (3, 10));
    assert!(queries[0].search.contains(&format!("organization_id = '{AMS_ORG_ID}'")));
    assert_eq!(page.links.first, "/api/entitlements/v1/seats?limit=10&offset=0");
    assert_eq!(page.links.previous, "/api/entitlements/v1/seats?limit=10&offset=15");
    assert_eq!(page.links.next, "/api/entitlements/v1/seats?limit=10&offset=35");
    assert_eq!((page.allowed, page.consumed), (2, 0));
}

#[tokio::test]
async fn list_seats_rejects_non_positive_limit() {
    let fixture = fixture(false);
    let err =
        handle_list_seats(State(fixture.state), CallerIdentity(admin()), query("limit=0"))
            .await
            .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn assign_seat_grants_directory_user() {
    let fixture = fixture(false);
    let seat = handle_assign_seat(
        State(fixture.state),
        CallerIdentity(admin()),
        Bytes::from_static(br#"{"account_username":"jdoe"}"#),
    )
    .await
    .unwrap();

    assert_eq!(seat.account_username, "jdoe");
    assert!(!seat.subscription_id.is_empty());
    let requests = fixture.accounts.authorization_requests();
    assert_eq!(requests[0].quota_version.as_deref(), Some("v1"));
}

#[tokio::test]
async fn assign_seat_rejects_invalid_body_and_foreign_user() {
    let fixture = fixture(false);
    let err = handle_assign_seat(
        State(fixture.state.clone()),
        CallerIdentity(admin()),
        Bytes::from_static(b"not json"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = handle_assign_seat(
        State(fixture.state),
        CallerIdentity(admin()),
        Bytes::from_static(br#"{"account_username":"outsider"}"#),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assign_seat_requires_org_admin() {
    let fixture = fixture(false);
    let identity = Identity {
        org_admin: false,
        ..admin()
    };
    let response = handle_assign_seat(
        State(fixture.state),
        CallerIdentity(identity),
        Bytes::from_static(br#"{"account_username":"jdoe"}"#),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], 403);
    assert!(body["error"].is_string());
    assert_eq!(fixture.accounts.authorization_requests().len(), 0);
}

#[tokio::test]
async fn revoke_seat_deletes_own_subscription() {
    let fixture = fixture(false);
    let status = handle_revoke_seat(
        State(fixture.state),
        CallerIdentity(admin()),
        Path("sub-own".to_string()),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(fixture.accounts.deleted(), vec!["sub-own".to_string()]);
}

#[tokio::test]
async fn revoke_seat_cross_org_is_forbidden() {
    let fixture = fixture(false);
    let response = handle_revoke_seat(
        State(fixture.state),
        CallerIdentity(admin()),
        Path("sub-other".to_string()),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("AMSORGX"));
    assert!(message.contains(AMS_ORG_ID));
    assert!(fixture.accounts.deleted().is_empty());
}

#[tokio::test]
async fn revoke_seat_upstream_failure_is_internal_and_counted() {
    let fixture = fixture(false);
    fixture.accounts.set_failure(Some(UpstreamError::Timeout {
        service: "accounts",
    }));
    let err = handle_revoke_seat(
        State(fixture.state),
        CallerIdentity(admin()),
        Path("sub-own".to_string()),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.0.error, "accounts request timed out");
    let text = fixture.metrics.render().unwrap();
    assert!(text.contains("entitlements_upstream_errors_total{service=\"accounts\"} 1"));
}

// ============================================================================
// SECTION: Compliance
// ============================================================================

#[tokio::test]
async fn compliance_rejects_service_accounts_and_anonymous_users() {
    let fixture = fixture(false);
    let service_account = Identity {
        principal_type: PrincipalType::ServiceAccount,
        ..admin()
    };
    let err = handle_compliance(State(fixture.state.clone()), CallerIdentity(service_account))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let anonymous = Identity {
        username: String::new(),
        ..admin()
    };
    let err = handle_compliance(State(fixture.state), CallerIdentity(anonymous)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn compliance_without_host_is_internal_error() {
    let fixture = fixture(false);
    let err = handle_compliance(State(fixture.state), CallerIdentity(admin())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn compliance_relays_upstream_verdict() {
    let mut fixture = fixture(false);
    fixture.state.compliance = Some(Arc::new(FixedScreener {
        outcome: Ok(ScreeningResult {
            status: 400,
            body: json!({"result": "ERROR_OFAC"}),
        }),
    }));

    let response =
        handle_compliance(State(fixture.state), CallerIdentity(admin())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await, json!({"result": "ERROR_OFAC"}));
}

#[tokio::test]
async fn compliance_timeout_is_translated() {
    let mut fixture = fixture(false);
    fixture.state.compliance = Some(Arc::new(FixedScreener {
        outcome: Err(UpstreamError::Timeout {
            service: "compliance",
        }),
    }));

    let err = handle_compliance(State(fixture.state), CallerIdentity(admin())).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.0.error, "compliance request timed out");
}

// ============================================================================
// SECTION: Service Endpoints
// ============================================================================

#[tokio::test]
async fn status_reports_build_information() {
    let fixture = fixture(false);
    let response = handle_status(State(fixture.state)).await.into_response();
    assert_eq!(body_json(response).await, json!({"apiVersion": "1.2.3", "commit": "abc123"}));
}

#[tokio::test]
async fn openapi_is_served_from_file() {
    let mut fixture = fixture(false);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"{"openapi":"3.0.0"}"#).unwrap();
    fixture.state.openapi_path = file.path().to_path_buf();

    let response = handle_openapi(State(fixture.state)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"openapi": "3.0.0"}));
}

#[tokio::test]
async fn missing_openapi_file_is_internal_error() {
    let fixture = fixture(false);
    let err = handle_openapi(State(fixture.state)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn metrics_endpoint_renders_exposition() {
    let fixture = fixture(false);
    handle_services(State(fixture.state.clone()), CallerIdentity(admin()), RawQuery(None)).await;
    let response = handle_metrics(State(fixture.state)).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("entitlements_feature_status_cache_total{outcome=\"miss\"} 1"));
}
