//! Core types for coordination state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// What one agent is doing right now
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentWorkState {
    pub agent_id: String,
    pub session_id: Option<String>,
    pub task_description: String,
    /// Paths this agent holds an exclusive edit lock on
    pub files_editing: BTreeSet<PathBuf>,
    pub started_at: DateTime<Utc>,
}

impl AgentWorkState {
    pub fn new(agent_id: &str, session_id: Option<&str>, task_description: &str) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            session_id: session_id.map(|s| s.to_string()),
            task_description: task_description.to_string(),
            files_editing: BTreeSet::new(),
            started_at: Utc::now(),
        }
    }
}

/// A bounded excerpt of one agent's output, visible to all agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedArtifact {
    pub artifact_id: String,
    pub agent_id: String,
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
}

/// Another agent already working on an overlapping task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub agent_id: String,
    pub task_description: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub agents: Vec<AgentWorkState>,
    pub artifact_count: usize,
}

impl RegistrySnapshot {
    /// Total locks held across all agents
    pub fn lock_count(&self) -> usize {
        self.agents.iter().map(|a| a.files_editing.len()).sum()
    }
}
