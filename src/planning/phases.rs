//! Keyword-based phase detection

use serde::{Deserialize, Serialize};

use super::types::AgentRole;
use crate::utils::{contains_any, normalize_text};

/// Canonical stages of hierarchical work, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Discovery,
    Design,
    Implementation,
    Validation,
    Refinement,
}

impl PhaseKind {
    pub fn all() -> &'static [PhaseKind] {
        &[
            PhaseKind::Discovery,
            PhaseKind::Design,
            PhaseKind::Implementation,
            PhaseKind::Validation,
            PhaseKind::Refinement,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhaseKind::Discovery => "discovery",
            PhaseKind::Design => "design",
            PhaseKind::Implementation => "implementation",
            PhaseKind::Validation => "validation",
            PhaseKind::Refinement => "refinement",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            PhaseKind::Discovery => &[
                "investigate", "research", "explore", "analyze", "analyse", "audit", "understand",
                "survey", "find out",
            ],
            PhaseKind::Design => &[
                "design", "architect", "plan ", "schema", "interface", "api contract", "spec out",
                "model the",
            ],
            PhaseKind::Implementation => &[
                "implement", "build", "write", "create", "add ", "migrate", "refactor", "code",
                "develop", "port ",
            ],
            PhaseKind::Validation => &[
                "test", "verify", "validate", "benchmark", "check", "qa", "coverage",
            ],
            PhaseKind::Refinement => &[
                "optimize", "optimise", "polish", "refine", "clean up", "cleanup", "document",
                "harden",
            ],
        }
    }

    /// Primary role for agents working this phase
    pub fn lead_role(&self) -> AgentRole {
        match self {
            PhaseKind::Discovery => AgentRole::Researcher,
            PhaseKind::Design => AgentRole::Architect,
            PhaseKind::Implementation => AgentRole::Implementer,
            PhaseKind::Validation => AgentRole::Tester,
            PhaseKind::Refinement => AgentRole::Reviewer,
        }
    }

    pub fn instructions(&self, task: &str) -> String {
        match self {
            PhaseKind::Discovery => format!(
                "Investigate the existing code and constraints relevant to: {}. Report findings, risks and open questions.",
                task
            ),
            PhaseKind::Design => format!(
                "Design the approach for: {}. Define components, interfaces and data flow before any code is written.",
                task
            ),
            PhaseKind::Implementation => format!(
                "Implement the agreed design for: {}. Keep changes scoped to the design.",
                task
            ),
            PhaseKind::Validation => format!(
                "Validate the implementation of: {}. Add or extend tests and confirm acceptance criteria.",
                task
            ),
            PhaseKind::Refinement => format!(
                "Refine the result of: {}. Address review findings, tidy the code and update documentation.",
                task
            ),
        }
    }
}

/// Phases whose keywords appear in `task`, in canonical order
pub fn detect_phases(task: &str) -> Vec<PhaseKind> {
    let text = normalize_text(task);
    PhaseKind::all()
        .iter()
        .copied()
        .filter(|kind| contains_any(&text, kind.keywords()))
        .collect()
}

/// Detected phases completed into a runnable chain.
///
/// Design, implementation and validation are always present; discovery
/// and refinement only when the task asks for them.
pub fn phase_chain(task: &str) -> Vec<PhaseKind> {
    let mut phases = detect_phases(task);
    for required in [PhaseKind::Design, PhaseKind::Implementation, PhaseKind::Validation] {
        if !phases.contains(&required) {
            phases.push(required);
        }
    }
    phases.sort();
    phases
}
