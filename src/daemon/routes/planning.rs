//! Triage and planning endpoints

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::{api_error, ApiError};
use crate::daemon::state::DaemonState;
use crate::daemon::types::TaskRequest;
use crate::planning::TaskPlanOutcome;
use crate::triage::TriageConsensus;

fn validate(request: &TaskRequest) -> Result<(), ApiError> {
    if request.task.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "EMPTY_TASK",
            "task must not be empty",
        ));
    }
    Ok(())
}

/// POST /api/triage
pub async fn triage(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TriageConsensus>, ApiError> {
    validate(&request)?;

    let result = state
        .planner
        .triage()
        .triage(&request.task)
        .await
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "TRIAGE_FAILED",
                format!("Triage failed: {}", e),
            )
        })?;
    Ok(Json(result.value))
}

/// POST /api/plan
pub async fn plan(
    State(state): State<Arc<DaemonState>>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskPlanOutcome>, ApiError> {
    validate(&request)?;

    let outcome = state
        .planner
        .plan_task(&request.task, request.pattern)
        .await
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PLANNING_FAILED",
                format!("Planning failed: {}", e),
            )
        })?;
    Ok(Json(outcome))
}
