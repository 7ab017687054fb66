//! Hook Router
//!
//! Dispatches each hook kind to its handler. Every event is audited
//! before the registry is consulted.

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use super::audit::{AuditLog, AuditRecord};
use super::denylist::DangerousCommandDetector;
use super::types::{HookDecision, HookKind, HookPayload};
use crate::coordination::CoordinationRegistry;

/// Artifacts handed to a freshly spawned sub-agent as inherited context
const INHERITED_ARTIFACTS: usize = 3;

pub struct HookRouter {
    registry: Arc<CoordinationRegistry>,
    detector: DangerousCommandDetector,
    audit: AuditLog,
}

impl HookRouter {
    pub fn new(
        registry: Arc<CoordinationRegistry>,
        detector: DangerousCommandDetector,
        audit: AuditLog,
    ) -> Self {
        Self {
            registry,
            detector,
            audit,
        }
    }

    pub fn registry(&self) -> &Arc<CoordinationRegistry> {
        &self.registry
    }

    /// Decide whether the agent may proceed with the reported action
    pub async fn route(&self, kind: HookKind, payload: &HookPayload) -> HookDecision {
        self.audit.record(AuditRecord::from_event(kind, payload));

        let Some(agent_id) = payload.agent_identity() else {
            return HookDecision::proceed(kind)
                .with_metadata("coordination", Value::from("skipped"))
                .with_metadata("reason", Value::from("no agent identity"));
        };

        match kind {
            HookKind::PreCommand => self.pre_command(agent_id, payload).await,
            HookKind::PreEdit => self.pre_edit(agent_id, payload).await,
            HookKind::PostEdit => self.post_edit(agent_id, payload).await,
            HookKind::PreAgentSpawn => self.pre_agent_spawn(agent_id, payload).await,
            HookKind::PostAgentSpawn => self.post_agent_spawn(agent_id, payload).await,
        }
    }

    async fn pre_command(&self, agent_id: &str, payload: &HookPayload) -> HookDecision {
        self.registry
            .register_or_get_agent(agent_id, payload.session_id.as_deref(), "")
            .await;

        let mut decision = HookDecision::proceed(HookKind::PreCommand);
        let Some(command) = payload.tool_input.command.as_deref() else {
            return decision;
        };

        let matched = self.detector.matches(command);
        if !matched.is_empty() {
            tracing::warn!("Agent {} is running a dangerous command: {}", agent_id, command);
            decision = decision
                .with_metadata("dangerous", Value::Bool(true))
                .with_metadata("matched_patterns", json!(matched));
        }
        decision
    }

    async fn pre_edit(&self, agent_id: &str, payload: &HookPayload) -> HookDecision {
        self.registry
            .register_or_get_agent(agent_id, payload.session_id.as_deref(), "")
            .await;

        let mut locked = Vec::new();
        let mut conflicts = Vec::new();
        for path in payload.file_paths() {
            if self.registry.acquire_file_lock(agent_id, Path::new(&path)).await {
                locked.push(path);
            } else {
                let holder = self.registry.lock_holder(Path::new(&path)).await;
                conflicts.push(json!({ "path": path, "holder": holder }));
            }
        }

        let mut decision = HookDecision::proceed(HookKind::PreEdit)
            .with_metadata("locked", json!(locked));
        if !conflicts.is_empty() {
            tracing::info!("Agent {} is editing {} locked file(s)", agent_id, conflicts.len());
            decision = decision
                .with_metadata("conflicts", Value::Array(conflicts))
                .with_metadata(
                    "warning",
                    Value::from("Another agent is editing these files; coordinate before writing"),
                );
        }
        decision
    }

    async fn post_edit(&self, agent_id: &str, payload: &HookPayload) -> HookDecision {
        let mut released = Vec::new();
        for path in payload.file_paths() {
            if self.registry.release_file_lock(agent_id, Path::new(&path)).await {
                released.push(path);
            }
        }
        HookDecision::proceed(HookKind::PostEdit).with_metadata("released", json!(released))
    }

    async fn pre_agent_spawn(&self, agent_id: &str, payload: &HookPayload) -> HookDecision {
        let session_id = payload.session_id.as_deref();
        let Some(task) = payload.task_text() else {
            self.registry.register_or_get_agent(agent_id, session_id, "").await;
            return HookDecision::proceed(HookKind::PreAgentSpawn);
        };

        if let Some(duplicate) = self.registry.check_duplicate_work(agent_id, task).await {
            tracing::info!(
                "Blocking spawn for {}: duplicates {} ({:.2})",
                agent_id,
                duplicate.agent_id,
                duplicate.similarity
            );
            let reason = format!(
                "Agent {} is already working on a similar task ({:.0}% overlap): {}",
                duplicate.agent_id,
                duplicate.similarity * 100.0,
                duplicate.task_description
            );
            return HookDecision::block(HookKind::PreAgentSpawn, reason)
                .with_metadata("duplicate_of", json!(duplicate));
        }

        // A blocked spawn never starts, so only admitted agents are registered
        self.registry.register_or_get_agent(agent_id, session_id, task).await;
        self.registry.update_task(agent_id, task).await;
        let inherited = self
            .registry
            .recent_artifacts(INHERITED_ARTIFACTS, Some(agent_id))
            .await;

        let mut decision = HookDecision::proceed(HookKind::PreAgentSpawn);
        if !inherited.is_empty() {
            decision = decision.with_metadata("shared_context", json!(inherited));
        }
        decision
    }

    async fn post_agent_spawn(&self, agent_id: &str, payload: &HookPayload) -> HookDecision {
        let mut decision = HookDecision::proceed(HookKind::PostAgentSpawn);

        if let Some(output) = payload.response_text() {
            let artifact_id = self.registry.share_result(agent_id, &output).await;
            decision = decision.with_metadata("artifact_id", Value::from(artifact_id));
        }

        let released = self.registry.cleanup_agent(agent_id).await.unwrap_or_default();
        decision.with_metadata("released", json!(released))
    }
}
