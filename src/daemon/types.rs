//! Daemon request and response bodies

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::lifecycle::LifecycleState;
use crate::cache::CacheMetricsSnapshot;
use crate::planning::PlanPattern;

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: error.into(),
            code: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResponse {
    pub status: String,
    pub pid: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pid: u32,
    pub state: LifecycleState,
    pub uptime_secs: u64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub active_agents: usize,
    pub locked_files: usize,
    pub artifacts: usize,
    pub cache: CacheMetricsSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRegisterRequest {
    pub agent_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRegisterResponse {
    pub acquired: bool,
    pub file_path: String,
    /// Current owner when the lock was not granted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUnregisterRequest {
    pub agent_id: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUnregisterResponse {
    pub released: bool,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareRequest {
    pub agent_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub artifact_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub agent_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// False when the agent was already gone
    pub cleaned: bool,
    pub released_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub exclude_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PlanPattern>,
}
