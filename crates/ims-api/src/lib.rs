//! # ims-api: Product Lifecycle Service
//!
//! Axum service exposing the product lifecycle state machine from
//! `ims-state` over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! routes ──► engine ──► ims_state::plan_transition (pure)
//!                  └──► repository::commit (version compare-and-swap)
//!                          ├── in-memory (one RwLock over products + audit log)
//!                          └── PostgreSQL (one transaction)
//! ```
//!
//! ## Middleware Stack (outermost first)
//!
//! ```text
//! TraceLayer → Metrics → Auth → RateLimit → Handler
//! ```
//!
//! Health probes and `/metrics` are mounted outside the authenticated stack.

pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod repository;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Build the complete Axum application.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        secret: state.config.auth_secret.clone(),
    };
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::lifecycle::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(256 * 1024))
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(state.metrics.clone()));
    }

    let api = api
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(state.rate_limiter.clone()))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    if metrics_on {
        unauthenticated = unauthenticated.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics - Prometheus text exposition.
///
/// Product gauges are refreshed from the repository on every scrape.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = &state.metrics;
    match state.repo.counts().await {
        Ok(counts) => {
            metrics.products_total().reset();
            for (lifecycle_state, n) in counts.iter() {
                metrics
                    .products_total()
                    .with_label_values(&[lifecycle_state.as_str()])
                    .set(n as f64);
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to refresh product gauges"),
    }

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.repo.ping().await {
        tracing::warn!(backend = state.repo.backend(), "storage health check failed: {e}");
        return (StatusCode::SERVICE_UNAVAILABLE, "storage unreachable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}
