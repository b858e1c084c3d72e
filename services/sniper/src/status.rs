//! Optional HTTP status endpoint
//!
//! Read-only: `/health`, `/stats` (live counters plus RPS) and `/metrics`.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use snipe_engine::Stats;

/// Max concurrent status requests.
pub const MAX_CONNECTIONS: usize = 64;

#[derive(Clone)]
pub struct StatusState {
    pub stats: Arc<Stats>,
    pub prometheus: PrometheusHandle,
    pub started_at: Instant,
}

pub fn build_router(state: StatusState, max_connections: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

async fn health_handler(State(state): State<StatusState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

async fn stats_handler(State(state): State<StatusState>) -> impl IntoResponse {
    let snapshot = state.stats.snapshot();
    let body = serde_json::json!({
        "started": state.stats.elapsed().is_some(),
        "rps": state.stats.rate_per_second(),
        "total": snapshot.total,
        "success": snapshot.success,
        "duplicate": snapshot.duplicate,
        "not_allowed": snapshot.not_allowed,
        "too_many_requests": snapshot.too_many_requests,
        "transient": snapshot.transient,
        "fatal": snapshot.fatal,
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus text exposition format.
async fn metrics_handler(State(state): State<StatusState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}
