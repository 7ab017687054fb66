//! HTTP client for the coordination daemon
//!
//! Every call is bounded by the configured request timeout. Hook calls
//! fail open: when the daemon can't be reached the caller gets a degraded
//! `proceed` decision instead of an error.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use super::types::{
    CleanupRequest, CleanupResponse, ErrorResponse, FileRegisterRequest, FileRegisterResponse,
    FileUnregisterRequest, FileUnregisterResponse, HealthResponse, LiveResponse, ShareRequest,
    ShareResponse, TaskRequest,
};
use crate::cache::CacheMetricsSnapshot;
use crate::config::DaemonConfig;
use crate::coordination::RegistrySnapshot;
use crate::hooks::{HookDecision, HookKind, HookPayload};
use crate::planning::{PlanPattern, TaskPlanOutcome};
use crate::triage::TriageConsensus;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("daemon unreachable at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("daemon returned {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("invalid daemon response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether the daemon could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Transport { .. } => "transport",
            ClientError::Status { .. } => "status",
            ClientError::Decode(_) => "decode",
        }
    }
}

#[derive(Clone)]
pub struct DaemonClient {
    base_url: String,
    client: Client,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(config.base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => (err.code, err.error),
                Err(_) => ("HTTP_ERROR".to_string(), body),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                code,
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url, source })?;
        Self::decode(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url, source })?;
        Self::decode(response).await
    }

    /// Liveness probe; any failure means "not running"
    pub async fn is_running(&self) -> bool {
        self.get::<LiveResponse>("/api/live").await.is_ok()
    }

    /// PID reported by a live daemon
    pub async fn live_pid(&self) -> Option<u32> {
        self.get::<LiveResponse>("/api/live").await.ok().map(|l| l.pid)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/api/health").await
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        self.post::<_, serde_json::Value>("/api/shutdown", &serde_json::json!({}))
            .await
            .map(|_| ())
    }

    pub async fn try_process_hook(
        &self,
        kind: HookKind,
        payload: &HookPayload,
    ) -> Result<HookDecision, ClientError> {
        self.post(&format!("/api/hooks/{}", kind), payload).await
    }

    /// Route a hook through the daemon, proceeding in degraded mode on
    /// any failure.
    pub async fn process_hook(&self, kind: HookKind, payload: &HookPayload) -> HookDecision {
        match self.try_process_hook(kind, payload).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!("Coordination degraded for {}: {}", kind, e);
                HookDecision::degraded(kind, e.to_string())
            }
        }
    }

    pub async fn register_file(
        &self,
        agent_id: &str,
        session_id: Option<&str>,
        file_path: &str,
    ) -> Result<FileRegisterResponse, ClientError> {
        let request = FileRegisterRequest {
            agent_id: agent_id.to_string(),
            session_id: session_id.map(|s| s.to_string()),
            file_path: file_path.to_string(),
        };
        self.post("/api/coordinate/file-register", &request).await
    }

    pub async fn unregister_file(
        &self,
        agent_id: &str,
        file_path: &str,
    ) -> Result<FileUnregisterResponse, ClientError> {
        let request = FileUnregisterRequest {
            agent_id: agent_id.to_string(),
            file_path: file_path.to_string(),
        };
        self.post("/api/coordinate/file-unregister", &request).await
    }

    pub async fn share_result(&self, agent_id: &str, content: &str) -> Result<String, ClientError> {
        let request = ShareRequest {
            agent_id: agent_id.to_string(),
            content: content.to_string(),
        };
        let response: ShareResponse = self.post("/api/coordinate/share", &request).await?;
        Ok(response.artifact_id)
    }

    pub async fn cleanup_agent(&self, agent_id: &str) -> Result<Vec<PathBuf>, ClientError> {
        let request = CleanupRequest {
            agent_id: agent_id.to_string(),
        };
        let response: CleanupResponse = self.post("/api/coordinate/cleanup", &request).await?;
        Ok(response.released_files)
    }

    pub async fn agents(&self) -> Result<RegistrySnapshot, ClientError> {
        self.get("/api/coordinate/agents").await
    }

    pub async fn triage(&self, task: &str) -> Result<TriageConsensus, ClientError> {
        let request = TaskRequest {
            task: task.to_string(),
            pattern: None,
        };
        self.post("/api/triage", &request).await
    }

    pub async fn plan(
        &self,
        task: &str,
        pattern: Option<PlanPattern>,
    ) -> Result<TaskPlanOutcome, ClientError> {
        let request = TaskRequest {
            task: task.to_string(),
            pattern,
        };
        self.post("/api/plan", &request).await
    }

    pub async fn cache_stats(&self) -> Result<CacheMetricsSnapshot, ClientError> {
        self.get("/api/cache/stats").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable() -> DaemonClient {
        // Port 1 is reserved and refuses connections
        DaemonClient::new("http://127.0.0.1:1/", Duration::from_millis(300))
    }

    #[test]
    fn test_base_url_is_trimmed() {
        assert_eq!(unreachable().base_url(), "http://127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_not_running() {
        let client = unreachable();
        assert!(!client.is_running().await);
        assert!(client.health().await.unwrap_err().is_unreachable());
    }

    #[tokio::test]
    async fn test_hooks_fail_open() {
        let payload = HookPayload {
            agent_id: Some("agent-1".to_string()),
            ..Default::default()
        };
        let decision = unreachable()
            .process_hook(HookKind::PreAgentSpawn, &payload)
            .await;

        assert!(decision.proceed);
        assert!(decision.is_degraded());
        assert_eq!(decision.exit_code(), 0);
    }
}
