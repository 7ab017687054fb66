//! Direct registry endpoints for clients that don't go through hooks

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use super::{api_error, ApiError};
use crate::coordination::{RegistrySnapshot, SharedArtifact};
use crate::daemon::state::DaemonState;
use crate::daemon::types::{
    ArtifactsQuery, CleanupRequest, CleanupResponse, FileRegisterRequest, FileRegisterResponse,
    FileUnregisterRequest, FileUnregisterResponse, ShareRequest, ShareResponse,
};

const DEFAULT_ARTIFACT_LIMIT: usize = 20;

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "MISSING_FIELD",
            format!("{} must not be empty", field),
        ));
    }
    Ok(())
}

/// POST /api/coordinate/file-register
pub async fn file_register(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<FileRegisterRequest>,
) -> Result<Json<FileRegisterResponse>, ApiError> {
    require("agent_id", &request.agent_id)?;
    require("file_path", &request.file_path)?;

    state
        .registry
        .register_or_get_agent(&request.agent_id, request.session_id.as_deref(), "")
        .await;

    let path = Path::new(&request.file_path);
    let acquired = state.registry.acquire_file_lock(&request.agent_id, path).await;
    let holder = if acquired {
        None
    } else {
        state.registry.lock_holder(path).await
    };

    Ok(Json(FileRegisterResponse {
        acquired,
        file_path: request.file_path,
        holder,
    }))
}

/// POST /api/coordinate/file-unregister
pub async fn file_unregister(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<FileUnregisterRequest>,
) -> Result<Json<FileUnregisterResponse>, ApiError> {
    require("agent_id", &request.agent_id)?;
    require("file_path", &request.file_path)?;

    let released = state
        .registry
        .release_file_lock(&request.agent_id, Path::new(&request.file_path))
        .await;

    Ok(Json(FileUnregisterResponse {
        released,
        file_path: request.file_path,
    }))
}

/// POST /api/coordinate/share
pub async fn share(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, ApiError> {
    require("agent_id", &request.agent_id)?;

    let artifact_id = state
        .registry
        .share_result(&request.agent_id, &request.content)
        .await;
    Ok(Json(ShareResponse { artifact_id }))
}

/// POST /api/coordinate/cleanup
pub async fn cleanup(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>, ApiError> {
    require("agent_id", &request.agent_id)?;

    let response = match state.registry.cleanup_agent(&request.agent_id).await {
        Some(released_files) => CleanupResponse {
            cleaned: true,
            released_files,
        },
        None => CleanupResponse {
            cleaned: false,
            released_files: Vec::new(),
        },
    };
    Ok(Json(response))
}

/// GET /api/coordinate/agents
pub async fn agents(State(state): State<Arc<DaemonState>>) -> Json<RegistrySnapshot> {
    Json(state.registry.snapshot().await)
}

/// GET /api/coordinate/artifacts?limit=&exclude_agent=
pub async fn artifacts(
    State(state): State<Arc<DaemonState>>,
    Query(query): Query<ArtifactsQuery>,
) -> Json<Vec<SharedArtifact>> {
    let limit = query.limit.unwrap_or(DEFAULT_ARTIFACT_LIMIT);
    Json(
        state
            .registry
            .recent_artifacts(limit, query.exclude_agent.as_deref())
            .await,
    )
}
