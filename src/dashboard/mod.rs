pub mod handler;
pub mod views;

use crate::config::ThresholdsConfig;
use crate::fingerprint::FingerprintThrottler;
use crate::upstream::UpstreamClient;
use axum::routing::{get, post};
use axum::Router;
use deadpool_sqlite::Pool;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared state for the dashboard routes.
pub struct DashboardState {
    pub upstream: UpstreamClient,
    pub pool: Pool,
    pub thresholds: ThresholdsConfig,
    /// Enabled model names only; health data is never cached.
    pub models_cache: Cache<String, Vec<String>>,
    /// `None` when fingerprint reporting is disabled.
    pub throttler: Option<Arc<FingerprintThrottler>>,
}

impl DashboardState {
    pub fn new(
        upstream: UpstreamClient,
        pool: Pool,
        thresholds: ThresholdsConfig,
        models_cache_ttl_secs: u64,
        throttler: Option<Arc<FingerprintThrottler>>,
    ) -> Self {
        let models_cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(models_cache_ttl_secs))
            .build();

        Self {
            upstream,
            pool,
            thresholds,
            models_cache,
            throttler,
        }
    }
}

pub fn router(state: Arc<DashboardState>) -> Router {
    // Read-only dashboard data; any origin may embed it
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(handler::health))
        .route("/v1/models", get(handler::enabled_models))
        .route("/v1/model_health/hourly", get(handler::hourly))
        .route("/v1/public/model_health", get(handler::public_overview))
        .route("/v1/fingerprints", get(handler::fingerprints))
        .route(
            "/v1/fingerprints/duplicates",
            get(handler::duplicate_fingerprints),
        )
        .route("/v1/fingerprints/users", get(handler::fingerprint_users))
        .route("/v1/fingerprint/report", post(handler::report_fingerprint))
        .layer(cors)
        .with_state(state)
}
