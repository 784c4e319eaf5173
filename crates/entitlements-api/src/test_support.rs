// crates/entitlements-api/src/test_support.rs
// ============================================================================
// Module: Test Support
// Description: Shared fixtures for handler and router tests.
// Purpose: Build an `AppState` over in-memory collaborators.
// Dependencies: entitlements-core
// ============================================================================

//! ## Overview
//! The fixture registry holds `A` and `C` (SKU-based) and `B` (attribute
//! only). The caller org `4384938490324` maps to `AMSORG4384938490324` in the
//! in-memory accounts service, which holds a two-seat quota and one
//! subscription per org.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only panic-based assertions."
)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::response::Response;
use entitlements_core::BundleRegistry;
use entitlements_core::DirectoryUser;
use entitlements_core::EntitlementsEvaluator;
use entitlements_core::ErrorTranslator;
use entitlements_core::Feature;
use entitlements_core::FeatureSnapshot;
use entitlements_core::FeatureStatusCache;
use entitlements_core::FeatureStatusCacheConfig;
use entitlements_core::Identity;
use entitlements_core::InMemoryAccounts;
use entitlements_core::InMemoryUserDirectory;
use entitlements_core::QuotaCost;
use entitlements_core::SeatManager;
use entitlements_core::StaticFeatureStatus;
use entitlements_core::Subscription;
use serde_json::Value;

use crate::state::AppState;
use crate::state::ServiceStatus;
use crate::telemetry::PrometheusMetrics;

/// Bundle document used by every fixture.
pub const BUNDLES: &str = r"
- name: A
  skus: [SKU-A]
- name: B
  use_valid_acc_num: true
- name: C
  skus: [SKU-C]
";
/// Caller org id.
pub const ORG_ID: &str = "4384938490324";
/// Accounts-system id of the caller org.
pub const AMS_ORG_ID: &str = "AMSORG4384938490324";

/// Collaborators behind a fixture state.
pub struct Fixture {
    /// Handler state.
    pub state: AppState,
    /// Feature-status source.
    pub features: StaticFeatureStatus,
    /// Accounts service.
    pub accounts: InMemoryAccounts,
    /// Metrics sink.
    pub metrics: Arc<PrometheusMetrics>,
}

/// Builds a fixture; `A` is reported as an entitled trial.
pub fn fixture(entitle_all: bool) -> Fixture {
    let features = StaticFeatureStatus::new(FeatureSnapshot {
        features: vec![Feature {
            name: "A".to_string(),
            is_eval: true,
            entitled: true,
        }],
    });
    let accounts = InMemoryAccounts::new()
        .with_quota(AMS_ORG_ID, QuotaCost {
            quota_id: "seat|ansible.wisdom".to_string(),
            allowed: 2,
            consumed: 0,
            version: Some("v1".to_string()),
        })
        .with_subscription(Subscription {
            id: "sub-own".to_string(),
            organization_id: Some(AMS_ORG_ID.to_string()),
            status: "Active".to_string(),
            creator: None,
        })
        .with_subscription(Subscription {
            id: "sub-other".to_string(),
            organization_id: Some("AMSORGX".to_string()),
            status: "Active".to_string(),
            creator: None,
        });
    let directory = InMemoryUserDirectory::new()
        .with_user(DirectoryUser {
            username: "jdoe".to_string(),
            org_id: ORG_ID.to_string(),
            email: "jdoe@example.com".to_string(),
            is_org_admin: false,
        })
        .with_user(DirectoryUser {
            username: "outsider".to_string(),
            org_id: "999".to_string(),
            email: "outsider@example.com".to_string(),
            is_org_admin: false,
        });

    let registry = BundleRegistry::from_yaml_str(BUNDLES, "_paid", false).unwrap();
    let cache = FeatureStatusCache::new(
        Arc::new(features.clone()),
        FeatureStatusCacheConfig::default(),
    );
    let metrics = Arc::new(PrometheusMetrics::new().unwrap());
    let state = AppState {
        evaluator: Arc::new(EntitlementsEvaluator::new(Arc::new(registry), cache, entitle_all)),
        seats: Arc::new(SeatManager::new(Arc::new(accounts.clone()), Arc::new(directory))),
        compliance: None,
        translator: ErrorTranslator::new(Some("Contact your administrator.".to_string())),
        metrics: metrics.clone(),
        status: ServiceStatus {
            api_version: "1.2.3".to_string(),
            commit: "abc123".to_string(),
        },
        openapi_path: PathBuf::from("/nonexistent/api.spec.json"),
    };
    Fixture {
        state,
        features,
        accounts,
        metrics,
    }
}

/// Org admin of the caller org.
pub fn admin() -> Identity {
    Identity {
        account_number: "540155".to_string(),
        org_id: ORG_ID.to_string(),
        email: "admin@example.com".to_string(),
        username: "admin".to_string(),
        org_admin: true,
        ..Identity::default()
    }
}

/// Reads a JSON response body.
pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
