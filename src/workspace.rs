//! Workspace context file identifying the agent working in a directory
//!
//! The file lives at the workspace root. Lookups start in the given
//! directory and ascend at most three parents; there is deliberately no
//! environment-variable fallback.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const CONTEXT_FILE_NAME: &str = ".conductor-context.json";

/// Parent directories searched above the starting directory
const MAX_PARENT_LEVELS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceContext {
    pub agent_id: String,
    pub coordination_id: String,
    pub created_at: DateTime<Utc>,
}

impl WorkspaceContext {
    pub fn new(agent_id: impl Into<String>, coordination_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            coordination_id: coordination_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Fresh identities for a workspace that has none yet
    pub fn generate() -> Self {
        let agent = Uuid::new_v4().to_string();
        let coordination = Uuid::new_v4().to_string();
        Self::new(
            format!("agent-{}", &agent[..8]),
            format!("coord-{}", &coordination[..8]),
        )
    }

    /// Write the context file into `workspace_root`, returning its path
    pub fn write(&self, workspace_root: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(workspace_root)?;
        let path = workspace_root.join(CONTEXT_FILE_NAME);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Find and read the nearest context file.
    ///
    /// A missing or unreadable file yields `None`: the caller simply has
    /// no agent identity.
    pub fn discover(start: &Path) -> Option<Self> {
        let mut dir = Some(start);
        for _ in 0..=MAX_PARENT_LEVELS {
            let current = dir?;
            let candidate = current.join(CONTEXT_FILE_NAME);
            if candidate.is_file() {
                return match Self::read(&candidate) {
                    Ok(ctx) => Some(ctx),
                    Err(e) => {
                        tracing::warn!("Ignoring unreadable {}: {}", candidate.display(), e);
                        None
                    }
                };
            }
            dir = current.parent();
        }
        None
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).context("Failed to parse workspace context")
    }
}
