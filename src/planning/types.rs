//! Core types for execution plans

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::triage::{ComplexityTier, TriageConsensus};

/// Plan generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanPattern {
    /// One agent, one phase
    Direct,
    /// Independent subtasks in parallel, then integration
    Fanout,
    /// Competing candidates, then critique and selection
    Tournament,
    /// A chain of dependent phases
    Hierarchical,
}

impl PlanPattern {
    pub fn all() -> &'static [PlanPattern] {
        &[
            PlanPattern::Direct,
            PlanPattern::Fanout,
            PlanPattern::Tournament,
            PlanPattern::Hierarchical,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanPattern::Direct => "direct",
            PlanPattern::Fanout => "fanout",
            PlanPattern::Tournament => "tournament",
            PlanPattern::Hierarchical => "hierarchical",
        }
    }
}

impl fmt::Display for PlanPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        PlanPattern::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| format!("unknown plan pattern: {}", s))
    }
}

/// Fixed set of roles an agent can be given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Researcher,
    Architect,
    Implementer,
    Tester,
    Reviewer,
    Critic,
    Integrator,
    Documenter,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Researcher => write!(f, "researcher"),
            AgentRole::Architect => write!(f, "architect"),
            AgentRole::Implementer => write!(f, "implementer"),
            AgentRole::Tester => write!(f, "tester"),
            AgentRole::Reviewer => write!(f, "reviewer"),
            AgentRole::Critic => write!(f, "critic"),
            AgentRole::Integrator => write!(f, "integrator"),
            AgentRole::Documenter => write!(f, "documenter"),
        }
    }
}

/// What a single agent in a phase is asked to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub role: AgentRole,
    /// Area tag such as "backend" or "testing"
    pub domain: String,
    pub instructions: String,
    /// Suggested working directory, relative to the workspace root
    pub workspace: String,
}

impl AgentSpec {
    pub fn new(
        role: AgentRole,
        domain: impl Into<String>,
        instructions: impl Into<String>,
        workspace: impl Into<String>,
    ) -> Self {
        Self {
            role,
            domain: domain.into(),
            instructions: instructions.into(),
            workspace: workspace.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub agent_specs: Vec<AgentSpec>,
    /// Names of phases that must finish first; empty for a first phase
    pub depends_on: BTreeSet<String>,
}

impl Phase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent_specs: Vec::new(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_agent(mut self, spec: AgentSpec) -> Self {
        self.agent_specs.push(spec);
        self
    }

    pub fn after<I, S>(mut self, phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(phases.into_iter().map(Into::into));
        self
    }
}

/// Review checkpoint attached to a phase.
///
/// Gates are policy for the reviewing agents; nothing here evaluates them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualityGate {
    pub name: String,
    pub phase: String,
    pub criteria: Vec<String>,
}

impl QualityGate {
    pub fn new(name: &str, phase: &str, criteria: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            phase: phase.to_string(),
            criteria: criteria.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A compiled plan. Contains no timestamps so identical requests
/// produce identical plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub pattern: PlanPattern,
    pub tier: ComplexityTier,
    pub task: String,
    pub phases: Vec<Phase>,
    pub quality_gates: BTreeSet<QualityGate>,
}

impl ExecutionPlan {
    pub fn new(pattern: PlanPattern, tier: ComplexityTier, task: impl Into<String>) -> Self {
        Self {
            pattern,
            tier,
            task: task.into(),
            phases: Vec::new(),
            quality_gates: BTreeSet::new(),
        }
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    pub fn agent_count(&self) -> usize {
        self.phases.iter().map(|p| p.agent_specs.len()).sum()
    }

    /// Check structural soundness: unique phase names, dependencies only
    /// on earlier phases, no empty phases, and gates on known phases.
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            bail!("plan has no phases");
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for phase in &self.phases {
            if phase.agent_specs.is_empty() {
                bail!("phase '{}' has no agents", phase.name);
            }
            for dep in &phase.depends_on {
                if !seen.contains(dep.as_str()) {
                    bail!("phase '{}' depends on unknown or later phase '{}'", phase.name, dep);
                }
            }
            if !seen.insert(phase.name.as_str()) {
                bail!("duplicate phase '{}'", phase.name);
            }
        }

        for gate in &self.quality_gates {
            if !seen.contains(gate.phase.as_str()) {
                bail!("gate '{}' targets unknown phase '{}'", gate.name, gate.phase);
            }
        }
        Ok(())
    }
}

/// Output of the pattern selection step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanComposition {
    pub pattern: PlanPattern,
    pub tier: ComplexityTier,
    pub rationale: String,
    pub detected_phases: Vec<super::phases::PhaseKind>,
}

/// A generated plan with its cache provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub plan: ExecutionPlan,
    pub from_cache: bool,
    pub fingerprint: String,
}

/// Result of planning a task end to end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlanOutcome {
    pub plan: ExecutionPlan,
    pub consensus: TriageConsensus,
    /// Name of the pre-built template used, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub triage_from_cache: bool,
    pub plan_from_cache: bool,
}
