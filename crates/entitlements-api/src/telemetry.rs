// crates/entitlements-api/src/telemetry.rs
// ============================================================================
// Module: Telemetry
// Description: Metrics sink interface and its Prometheus implementation.
// Purpose: Count requests, cache outcomes, degraded answers, upstream errors.
// Dependencies: prometheus, thiserror
// ============================================================================

//! ## Overview
//! Handlers and the request middleware report through [`EntitlementsMetrics`].
//! [`PrometheusMetrics`] keeps its own registry and renders the text
//! exposition served at `/metrics`; [`NoopMetrics`] discards everything and
//! renders nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Request latency buckets in seconds.
const REQUEST_LATENCY_BUCKETS: &[f64] =
    &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

// ============================================================================
// SECTION: Labels
// ============================================================================

/// Feature-status cache outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from a cached entry.
    Hit,
    /// Fetched successfully from the upstream.
    Miss,
    /// Fetch failed and a fail-closed marker was recorded.
    FailClosed,
}

impl CacheOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::FailClosed => "fail_closed",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metrics registry failures.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A metric could not be created or registered.
    #[error("failed to register metric: {0}")]
    Registration(#[from] prometheus::Error),
    /// The exposition could not be encoded.
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Metrics sink for the HTTP surface.
pub trait EntitlementsMetrics: Send + Sync {
    /// Records a completed request and its latency.
    fn record_request(&self, route: &str, status: u16, latency: Duration);
    /// Records the cache outcome of an evaluation.
    fn record_cache(&self, outcome: CacheOutcome);
    /// Records a degraded `/services` answer.
    fn record_degraded(&self);
    /// Records an upstream failure.
    fn record_upstream_error(&self, service: &str);
    /// Renders the text exposition.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Encoding`] when encoding fails.
    fn render(&self) -> Result<String, MetricsError>;
}

/// No-op metrics sink.
pub struct NoopMetrics;

impl EntitlementsMetrics for NoopMetrics {
    fn record_request(&self, _route: &str, _status: u16, _latency: Duration) {}

    fn record_cache(&self, _outcome: CacheOutcome) {}

    fn record_degraded(&self) {}

    fn record_upstream_error(&self, _service: &str) {}

    fn render(&self) -> Result<String, MetricsError> {
        Ok(String::new())
    }
}

// ============================================================================
// SECTION: Prometheus
// ============================================================================

/// Prometheus-backed metrics with a private registry.
pub struct PrometheusMetrics {
    /// Registry rendered at `/metrics`.
    registry: Registry,
    /// Requests by route and status.
    requests: IntCounterVec,
    /// Request latency by route.
    durations: HistogramVec,
    /// Cache outcomes.
    cache: IntCounterVec,
    /// Degraded `/services` answers.
    degraded: IntCounter,
    /// Upstream failures by service.
    upstream_errors: IntCounterVec,
}

impl PrometheusMetrics {
    /// Creates the metrics and registers them with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Registration`] when a metric cannot be
    /// registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("entitlements_http_requests_total", "HTTP requests by route and status"),
            &["route", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        let durations = HistogramVec::new(
            HistogramOpts::new(
                "entitlements_http_request_duration_seconds",
                "HTTP request latency by route",
            )
            .buckets(REQUEST_LATENCY_BUCKETS.to_vec()),
            &["route"],
        )?;
        registry.register(Box::new(durations.clone()))?;

        let cache = IntCounterVec::new(
            Opts::new(
                "entitlements_feature_status_cache_total",
                "Feature-status cache outcomes",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(cache.clone()))?;

        let degraded = IntCounter::new(
            "entitlements_degraded_responses_total",
            "Entitlement answers served fail-closed",
        )?;
        registry.register(Box::new(degraded.clone()))?;

        let upstream_errors = IntCounterVec::new(
            Opts::new("entitlements_upstream_errors_total", "Upstream failures by service"),
            &["service"],
        )?;
        registry.register(Box::new(upstream_errors.clone()))?;

        Ok(Self {
            registry,
            requests,
            durations,
            cache,
            degraded,
            upstream_errors,
        })
    }
}

impl EntitlementsMetrics for PrometheusMetrics {
    fn record_request(&self, route: &str, status: u16, latency: Duration) {
        let status = status.to_string();
        self.requests.with_label_values(&[route, status.as_str()]).inc();
        self.durations.with_label_values(&[route]).observe(latency.as_secs_f64());
    }

    fn record_cache(&self, outcome: CacheOutcome) {
        self.cache.with_label_values(&[outcome.as_str()]).inc();
    }

    fn record_degraded(&self) {
        self.degraded.inc();
    }

    fn record_upstream_error(&self, service: &str) {
        self.upstream_errors.with_label_values(&[service]).inc();
    }

    fn render(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|err| MetricsError::Encoding(err.to_string()))?;
        String::from_utf8(buffer).map_err(|err| MetricsError::Encoding(err.to_string()))
    }
}
