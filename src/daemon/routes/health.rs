//! Liveness, health, cache stats and shutdown endpoints

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::cache::CacheMetricsSnapshot;
use crate::daemon::state::DaemonState;
use crate::daemon::types::{HealthResponse, LiveResponse, ShutdownResponse};

/// GET /api/live
///
/// Answers as long as the server loop runs; touches no dependencies.
pub async fn live() -> Json<LiveResponse> {
    Json(LiveResponse {
        status: "ok".to_string(),
        pid: std::process::id(),
    })
}

/// GET /api/health
pub async fn health_check(State(state): State<Arc<DaemonState>>) -> Json<HealthResponse> {
    let snapshot = state.registry.snapshot().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pid: std::process::id(),
        state: state.lifecycle(),
        uptime_secs: state.uptime_secs(),
        total_requests: state.total_requests(),
        total_errors: state.total_errors(),
        active_agents: snapshot.agents.len(),
        locked_files: snapshot.lock_count(),
        artifacts: snapshot.artifact_count,
        cache: state.cache.metrics().await,
    })
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<Arc<DaemonState>>) -> Json<CacheMetricsSnapshot> {
    Json(state.cache.metrics().await)
}

/// POST /api/shutdown
pub async fn shutdown(State(state): State<Arc<DaemonState>>) -> Json<ShutdownResponse> {
    tracing::info!("Shutdown requested over the API");
    state.request_shutdown();
    Json(ShutdownResponse {
        status: "stopping".to_string(),
    })
}
