//! Hook processing endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{api_error, ApiError};
use crate::daemon::state::DaemonState;
use crate::hooks::{HookDecision, HookKind, HookPayload};

/// POST /api/hooks/:kind
pub async fn process_hook(
    State(state): State<Arc<DaemonState>>,
    Path(kind): Path<String>,
    Json(payload): Json<HookPayload>,
) -> Result<Json<HookDecision>, ApiError> {
    let kind: HookKind = kind
        .parse()
        .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, "UNKNOWN_HOOK", e))?;

    let decision = state.hooks.route(kind, &payload).await;
    Ok(Json(decision))
}
