//! Authoritative in-memory registry of agents, file locks and artifacts

use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::CoordinationConfig;
use crate::utils::{normalize_path, truncate_str};

use super::similarity::{token_overlap, tokenize};
use super::types::{AgentWorkState, DuplicateMatch, RegistrySnapshot, SharedArtifact};

#[derive(Default)]
struct RegistryState {
    agents: HashMap<String, AgentWorkState>,
    /// path -> owning agent; mirrors every agent's `files_editing`
    lock_owners: HashMap<PathBuf, String>,
    artifacts: Vec<SharedArtifact>,
}

impl RegistryState {
    fn agent_mut(&mut self, agent_id: &str) -> &mut AgentWorkState {
        self.agents
            .entry(agent_id.to_string())
            .or_insert_with(|| AgentWorkState::new(agent_id, None, ""))
    }
}

/// Registry of active agents shared by every request the daemon serves
pub struct CoordinationRegistry {
    state: Mutex<RegistryState>,
    similarity_threshold: f64,
    excerpt_chars: usize,
}

impl CoordinationRegistry {
    pub fn new(similarity_threshold: f64, excerpt_chars: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            similarity_threshold,
            excerpt_chars,
        }
    }

    pub fn from_config(config: &CoordinationConfig) -> Self {
        Self::new(config.similarity_threshold, config.artifact_excerpt_chars)
    }

    /// Return the agent's state, creating it on first sight.
    ///
    /// An existing agent keeps its task; a missing session id or empty
    /// task is filled in from this call.
    pub async fn register_or_get_agent(
        &self,
        agent_id: &str,
        session_id: Option<&str>,
        task_description: &str,
    ) -> AgentWorkState {
        let mut state = self.state.lock().await;
        let agent = state
            .agents
            .entry(agent_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Registering agent {}", agent_id);
                AgentWorkState::new(agent_id, session_id, task_description)
            });

        if agent.session_id.is_none() {
            agent.session_id = session_id.map(|s| s.to_string());
        }
        if agent.task_description.is_empty() && !task_description.is_empty() {
            agent.task_description = task_description.to_string();
        }
        agent.clone()
    }

    /// Replace the task an agent is working on
    pub async fn update_task(&self, agent_id: &str, task_description: &str) {
        let mut state = self.state.lock().await;
        state.agent_mut(agent_id).task_description = task_description.to_string();
    }

    /// Take an exclusive edit lock on `path`.
    ///
    /// Succeeds when the path is free or already held by `agent_id`;
    /// returns false without mutating anything when another agent holds it.
    pub async fn acquire_file_lock(&self, agent_id: &str, path: &Path) -> bool {
        let path = normalize_path(path);
        let mut state = self.state.lock().await;

        match state.lock_owners.get(&path) {
            Some(owner) if owner != agent_id => {
                tracing::debug!(
                    "{} is locked by {}; denied to {}",
                    path.display(),
                    owner,
                    agent_id
                );
                return false;
            }
            Some(_) => return true,
            None => {}
        }

        state.lock_owners.insert(path.clone(), agent_id.to_string());
        state.agent_mut(agent_id).files_editing.insert(path);
        true
    }

    /// Drop `agent_id`'s lock on `path`; no-op if it isn't held by them
    pub async fn release_file_lock(&self, agent_id: &str, path: &Path) -> bool {
        let path = normalize_path(path);
        let mut state = self.state.lock().await;

        if state.lock_owners.get(&path).map(String::as_str) != Some(agent_id) {
            return false;
        }
        state.lock_owners.remove(&path);
        if let Some(agent) = state.agents.get_mut(agent_id) {
            agent.files_editing.remove(&path);
        }
        true
    }

    pub async fn lock_holder(&self, path: &Path) -> Option<String> {
        let path = normalize_path(path);
        let state = self.state.lock().await;
        state.lock_owners.get(&path).cloned()
    }

    /// Find another active agent whose task overlaps `task_description`.
    ///
    /// Returns the most similar task at or above the configured threshold.
    pub async fn check_duplicate_work(
        &self,
        agent_id: &str,
        task_description: &str,
    ) -> Option<DuplicateMatch> {
        let tokens = tokenize(task_description);
        if tokens.is_empty() {
            return None;
        }

        let state = self.state.lock().await;
        state
            .agents
            .values()
            .filter(|other| other.agent_id != agent_id && !other.task_description.is_empty())
            .map(|other| {
                let similarity = token_overlap(&tokens, &tokenize(&other.task_description));
                (other, similarity)
            })
            .filter(|(_, similarity)| *similarity >= self.similarity_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(other, similarity)| DuplicateMatch {
                agent_id: other.agent_id.clone(),
                task_description: other.task_description.clone(),
                similarity,
            })
    }

    /// Append a bounded excerpt of `content` for other agents to inherit
    pub async fn share_result(&self, agent_id: &str, content: &str) -> String {
        let artifact = SharedArtifact {
            artifact_id: format!("artifact-{}", &Uuid::new_v4().to_string()[..8]),
            agent_id: agent_id.to_string(),
            excerpt: truncate_str(content, self.excerpt_chars).to_string(),
            created_at: Utc::now(),
        };
        let artifact_id = artifact.artifact_id.clone();

        let mut state = self.state.lock().await;
        state.artifacts.push(artifact);
        artifact_id
    }

    /// Most recent artifacts first, optionally hiding one agent's own
    pub async fn recent_artifacts(
        &self,
        limit: usize,
        exclude_agent: Option<&str>,
    ) -> Vec<SharedArtifact> {
        let state = self.state.lock().await;
        state
            .artifacts
            .iter()
            .rev()
            .filter(|a| Some(a.agent_id.as_str()) != exclude_agent)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Release every lock the agent holds and forget it.
    ///
    /// Returns the released paths, or `None` when the agent was unknown
    /// (including a second cleanup of the same agent).
    pub async fn cleanup_agent(&self, agent_id: &str) -> Option<Vec<PathBuf>> {
        let mut state = self.state.lock().await;
        let agent = state.agents.remove(agent_id)?;

        for path in &agent.files_editing {
            state.lock_owners.remove(path);
        }
        tracing::debug!(
            "Cleaned up agent {} ({} locks released)",
            agent_id,
            agent.files_editing.len()
        );
        Some(agent.files_editing.into_iter().collect())
    }

    pub async fn active_agents(&self) -> usize {
        self.state.lock().await.agents.len()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.lock().await;
        let mut agents: Vec<AgentWorkState> = state.agents.values().cloned().collect();
        agents.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        RegistrySnapshot {
            agents,
            artifact_count: state.artifacts.len(),
        }
    }
}

impl Default for CoordinationRegistry {
    fn default() -> Self {
        Self::from_config(&CoordinationConfig::default())
    }
}
