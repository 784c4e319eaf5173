// crates/entitlements-api/src/server.rs
// ============================================================================
// Module: Server
// Description: Router construction and service bootstrap.
// Purpose: Wire configuration into collaborators and serve HTTP.
// Dependencies: axum, entitlements-config, entitlements-core,
//               entitlements-providers, tokio, tracing
// ============================================================================

//! ## Overview
//! [`EntitlementsServer::from_config`] performs every fallible startup step:
//! configuration validation, bundle registry loading, PEM loading, outbound
//! client construction and collaborator selection (HTTP clients or the
//! in-memory mocks). Any failure there is fatal. [`build_router`] mounts the
//! handlers and the request metrics middleware over an [`AppState`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::MatchedPath;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::delete;
use axum::routing::get;
use entitlements_config::EntitlementsConfig;
use entitlements_core::AccountsService;
use entitlements_core::BundleError;
use entitlements_core::BundleRegistry;
use entitlements_core::ComplianceScreener;
use entitlements_core::EntitlementsEvaluator;
use entitlements_core::ErrorTranslator;
use entitlements_core::FeatureStatusCache;
use entitlements_core::FeatureStatusCacheConfig;
use entitlements_core::FeatureStatusSource;
use entitlements_core::InMemoryAccounts;
use entitlements_core::InMemoryUserDirectory;
use entitlements_core::SeatManager;
use entitlements_core::UserDirectory;
use entitlements_providers::AmsClient;
use entitlements_providers::AmsCredentials;
use entitlements_providers::BopClient;
use entitlements_providers::ComplianceClient;
use entitlements_providers::HttpFeatureStatus;
use entitlements_providers::ProviderInitError;
use entitlements_providers::build_http_client;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::handlers::handle_assign_seat;
use crate::handlers::handle_compliance;
use crate::handlers::handle_list_seats;
use crate::handlers::handle_metrics;
use crate::handlers::handle_openapi;
use crate::handlers::handle_revoke_seat;
use crate::handlers::handle_services;
use crate::handlers::handle_status;
use crate::state::AppState;
use crate::state::ServiceStatus;
use crate::telemetry::EntitlementsMetrics;
use crate::telemetry::MetricsError;
use crate::telemetry::PrometheusMetrics;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of the versioned API.
pub const API_PREFIX: &str = "/api/entitlements/v1";
/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server startup and runtime failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid or TLS material is unreadable.
    #[error("config error: {0}")]
    Config(String),
    /// Bundle registry could not be loaded.
    #[error(transparent)]
    Bundles(#[from] BundleError),
    /// An upstream client could not be built.
    #[error(transparent)]
    Provider(#[from] ProviderInitError),
    /// The metrics registry could not be built.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    /// Binding or serving failed.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Configured entitlements service.
pub struct EntitlementsServer {
    /// Validated configuration.
    config: EntitlementsConfig,
    /// Handler state.
    state: AppState,
}

impl EntitlementsServer {
    /// Builds the service from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration, bundle, TLS, or client
    /// initialization fails.
    pub fn from_config(config: EntitlementsConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let registry = BundleRegistry::load(
            &config.bundle_info_yaml,
            &config.paid_feature_suffix,
            config.allow_empty_bundles,
        )?;
        let pem = config.tls.load_pem().map_err(|err| ServerError::Config(err.to_string()))?;
        let client = build_http_client(&pem, config.it_services_timeout)?;

        let features: Arc<dyn FeatureStatusSource> = Arc::new(HttpFeatureStatus::new(
            client.clone(),
            &config.subs_host,
            &config.features_path,
            &registry.sku_based_names(),
        )?);
        let accounts: Arc<dyn AccountsService> = if config.ams.mock {
            warn!("using in-memory accounts service");
            Arc::new(InMemoryAccounts::new())
        } else {
            let credentials = config.has_ams_credentials().then(|| AmsCredentials {
                client_id: config.ams.client_id.clone(),
                client_secret: config.ams.client_secret.clone(),
                token_url: config.ams.token_url.clone(),
            });
            Arc::new(AmsClient::new(client.clone(), &config.ams.host, credentials)?)
        };
        let directory: Arc<dyn UserDirectory> = if config.bop.mock {
            warn!("using in-memory user directory");
            Arc::new(InMemoryUserDirectory::new())
        } else if config.bop.url.is_empty() {
            warn!("no user directory configured; seat assignment will fail");
            Arc::new(InMemoryUserDirectory::new())
        } else {
            Arc::new(BopClient::new(
                client.clone(),
                &config.bop.url,
                &config.bop.client_id,
                &config.bop.token,
                &config.bop.env,
            )?)
        };
        let compliance: Option<Arc<dyn ComplianceScreener>> =
            if config.compliance_host.is_empty() {
                None
            } else {
                Some(Arc::new(ComplianceClient::new(client, &config.compliance_host)?))
            };

        let cache = FeatureStatusCache::new(features, FeatureStatusCacheConfig {
            ttl: config.cache.ttl,
            max_entries: config.cache.max_entries,
        });
        info!(bundles = registry.len(), "bundle registry loaded");
        if config.entitle_all {
            warn!("global entitlement override active; every bundle is entitled");
        }
        let evaluator = EntitlementsEvaluator::new(Arc::new(registry), cache, config.entitle_all);
        let metrics: Arc<dyn EntitlementsMetrics> = Arc::new(PrometheusMetrics::new()?);

        let state = AppState {
            evaluator: Arc::new(evaluator),
            seats: Arc::new(SeatManager::new(accounts, directory)),
            compliance,
            translator: ErrorTranslator::new(config.ams.acct_mgmt_11_message.clone()),
            metrics,
            status: ServiceStatus {
                api_version: config.api_version.clone(),
                commit: config.commit.clone(),
            },
            openapi_path: config.openapi_spec_path.clone(),
        };
        Ok(Self {
            config,
            state,
        })
    }

    /// Returns the handler state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Binds the configured port and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self.config.listen_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("bind {addr} failed: {err}")))?;
        info!(%addr, "entitlements service listening");
        axum::serve(listener, build_router(self.state))
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the service router over `state`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/services", get(handle_services))
        .route("/compliance", get(handle_compliance))
        .route("/seats", get(handle_list_seats).post(handle_assign_seat))
        .route("/seats/{id}", delete(handle_revoke_seat))
        .route("/openapi.json", get(handle_openapi));
    Router::new()
        .nest(API_PREFIX, api)
        .route("/status", get(handle_status))
        .route("/metrics", get(handle_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_metrics))
        .with_state(state)
}

/// Records request count and latency under the matched route.
async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| UNMATCHED_ROUTE.to_string(), |path| path.as_str().to_string());
    let started = Instant::now();
    let response = next.run(request).await;
    state.metrics.record_request(&route, response.status().as_u16(), started.elapsed());
    response
}
