//! Coordination daemon
//!
//! A long-lived HTTP service that owns the coordination registry and the
//! planning engine. Short-lived hook and CLI processes talk to it through
//! [`client::DaemonClient`]; [`lifecycle`] manages the process itself.

pub mod client;
pub mod fallback;
pub mod lifecycle;
pub mod routes;
pub mod state;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use client::{ClientError, DaemonClient};
pub use lifecycle::{DaemonStatus, LifecycleState};
pub use state::DaemonState;

/// Count every request, and every 4xx/5xx response as an error
async fn track_requests(
    State(state): State<Arc<DaemonState>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    state.record_request(status.is_client_error() || status.is_server_error());
    response
}

pub fn router(state: Arc<DaemonState>) -> Router {
    Router::new()
        // Lifecycle
        .route("/api/live", get(routes::health::live))
        .route("/api/health", get(routes::health::health_check))
        .route("/api/shutdown", post(routes::health::shutdown))

        // Hooks
        .route("/api/hooks/:kind", post(routes::hooks::process_hook))

        // Registry
        .route("/api/coordinate/file-register", post(routes::coordinate::file_register))
        .route("/api/coordinate/file-unregister", post(routes::coordinate::file_unregister))
        .route("/api/coordinate/share", post(routes::coordinate::share))
        .route("/api/coordinate/cleanup", post(routes::coordinate::cleanup))
        .route("/api/coordinate/agents", get(routes::coordinate::agents))
        .route("/api/coordinate/artifacts", get(routes::coordinate::artifacts))

        // Planning
        .route("/api/triage", post(routes::planning::triage))
        .route("/api/plan", post(routes::planning::plan))
        .route("/api/cache/stats", get(routes::health::cache_stats))

        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `/api/shutdown` is called or `signal` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<DaemonState>,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state.clone());
    let watcher = state.clone();
    let shutdown = async move {
        tokio::select! {
            _ = watcher.shutdown_requested() => {}
            _ = signal => {}
        }
        watcher.set_lifecycle(LifecycleState::Stopping);
        tracing::info!("Daemon shutting down");
    };

    state.set_lifecycle(LifecycleState::Running);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;
    state.set_lifecycle(LifecycleState::Stopped);
    served?;
    Ok(())
}
