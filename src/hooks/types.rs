//! Hook Types
//!
//! Event kinds, the payload agents send and the decision they get back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Exit code a hook process uses to block a sub-agent spawn
pub const BLOCK_EXIT_CODE: i32 = 2;

/// Lifecycle events reported by agent processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Before a shell command runs
    PreCommand,
    /// Before files are edited
    PreEdit,
    /// After files were edited
    PostEdit,
    /// Before a sub-agent is spawned
    PreAgentSpawn,
    /// After a sub-agent finished
    PostAgentSpawn,
}

impl HookKind {
    pub fn all() -> &'static [HookKind] {
        &[
            HookKind::PreCommand,
            HookKind::PreEdit,
            HookKind::PostEdit,
            HookKind::PreAgentSpawn,
            HookKind::PostAgentSpawn,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::PreCommand => "pre_command",
            HookKind::PreEdit => "pre_edit",
            HookKind::PostEdit => "post_edit",
            HookKind::PreAgentSpawn => "pre_agent_spawn",
            HookKind::PostAgentSpawn => "post_agent_spawn",
        }
    }

    /// Whether a decision for this kind is ever allowed to block
    pub fn can_block(&self) -> bool {
        matches!(self, HookKind::PreAgentSpawn)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookKind {
    type Err = String;

    /// Accepts both `pre_edit` and `pre-edit`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        HookKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown hook kind: {}", s))
    }
}

/// Tool arguments relevant to coordination; unknown fields are ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Event document an agent process sends for every hook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Filled from the workspace context file by the hook client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: ToolInput,
    /// Tool result, present on post-* events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_response: Option<Value>,
}

impl HookPayload {
    /// The identity coordination is keyed on: agent id, else session id
    pub fn agent_identity(&self) -> Option<&str> {
        self.agent_id
            .as_deref()
            .or(self.session_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Every file path mentioned by the tool input, deduplicated in order
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let candidates = self
            .tool_input
            .file_path
            .iter()
            .chain(self.tool_input.file_paths.iter());
        for path in candidates {
            if !path.is_empty() && !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Task text of a sub-agent spawn
    pub fn task_text(&self) -> Option<&str> {
        self.tool_input
            .prompt
            .as_deref()
            .or(self.tool_input.description.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Tool response rendered as text
    pub fn response_text(&self) -> Option<String> {
        match self.tool_response.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Answer returned for every hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookDecision {
    pub proceed: bool,
    pub hook: HookKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl HookDecision {
    pub fn proceed(hook: HookKind) -> Self {
        Self {
            proceed: true,
            hook,
            reason: None,
            metadata: Map::new(),
        }
    }

    pub fn block(hook: HookKind, reason: impl Into<String>) -> Self {
        Self {
            proceed: false,
            hook,
            reason: Some(reason.into()),
            metadata: Map::new(),
        }
    }

    /// Proceed without coordination, e.g. when the daemon is unreachable
    pub fn degraded(hook: HookKind, why: impl Into<String>) -> Self {
        Self::proceed(hook)
            .with_metadata("coordination", Value::from("degraded"))
            .with_metadata("degraded_reason", Value::from(why.into()))
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.get("coordination").and_then(Value::as_str) == Some("degraded")
    }

    /// Process exit code for the hook entry point
    pub fn exit_code(&self) -> i32 {
        if !self.proceed && self.hook.can_block() {
            BLOCK_EXIT_CODE
        } else {
            0
        }
    }
}
