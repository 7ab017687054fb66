//! Plan generators, one per pattern
//!
//! Generators are pure: the same task, tier and settings always produce
//! the same plan.

use super::phases::{phase_chain, PhaseKind};
use super::types::{AgentRole, AgentSpec, ExecutionPlan, Phase, PlanPattern, QualityGate};
use crate::config::PlanningConfig;
use crate::triage::ComplexityTier;
use crate::utils::{contains_any, normalize_text};

/// Knobs that shape generated plans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub max_parallel_agents: usize,
    pub tournament_candidates: usize,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::from(&PlanningConfig::default())
    }
}

impl From<&PlanningConfig> for GeneratorSettings {
    fn from(config: &PlanningConfig) -> Self {
        Self {
            max_parallel_agents: config.max_parallel_agents.max(1),
            tournament_candidates: config.tournament_candidates.max(2),
        }
    }
}

pub fn generate(
    pattern: PlanPattern,
    task: &str,
    tier: ComplexityTier,
    settings: &GeneratorSettings,
) -> ExecutionPlan {
    let task = task.trim();
    match pattern {
        PlanPattern::Direct => direct(task, tier),
        PlanPattern::Fanout => fanout(task, tier, settings),
        PlanPattern::Tournament => tournament(task, tier, settings),
        PlanPattern::Hierarchical => hierarchical(task, tier),
    }
}

/// Best-effort area tag for a piece of work
pub fn infer_domain(text: &str) -> &'static str {
    let text = normalize_text(text);
    const DOMAINS: &[(&str, &[&str])] = &[
        ("testing", &["test", "coverage", "spec ", "fixture"]),
        ("documentation", &["readme", "docs", "documentation", "changelog", "docstring"]),
        ("frontend", &["user interface", "frontend", "css", "component", "page", "react"]),
        ("database", &["database", "schema", "migration", "sql", "query", "index"]),
        ("infrastructure", &["deploy", "docker", "ci ", "pipeline", "kubernetes", "terraform"]),
        ("backend", &["api", "endpoint", "server", "service", "handler", "backend"]),
    ];
    DOMAINS
        .iter()
        .find(|(_, keywords)| contains_any(&text, keywords))
        .map(|(domain, _)| *domain)
        .unwrap_or("general")
}

fn strip_enumeration(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(['.', ')']) {
            return rest.trim();
        }
    }
    line.trim()
}

/// Split a task into independent subtasks.
///
/// Enumerated lines win; otherwise the text is split on `;`, commas and
/// "and". Fragments shorter than two words are treated as part of a
/// single task, so "fix bugs and typos" stays whole.
pub fn split_subtasks(task: &str) -> Vec<String> {
    let lines: Vec<&str> = task
        .lines()
        .map(strip_enumeration)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() >= 2 {
        return lines.into_iter().map(str::to_string).collect();
    }

    let mut parts: Vec<String> = Vec::new();
    for clause in task.split(';') {
        for part in clause.split(", ") {
            let part = part.trim().trim_start_matches("and ");
            for piece in part.split(" and ") {
                let piece = piece.trim().trim_end_matches(['.', ',']);
                if !piece.is_empty() {
                    parts.push(piece.to_string());
                }
            }
        }
    }

    if parts.len() >= 2 && parts.iter().all(|p| p.split_whitespace().count() >= 2) {
        parts
    } else {
        vec![task.trim().to_string()]
    }
}

fn direct(task: &str, tier: ComplexityTier) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PlanPattern::Direct, tier, task);
    plan.phases.push(Phase::new("execute").with_agent(AgentSpec::new(
        AgentRole::Implementer,
        infer_domain(task),
        format!("Complete the task end to end: {}", task),
        ".",
    )));
    plan.quality_gates.insert(QualityGate::new(
        "change-review",
        "execute",
        &["change matches the request", "existing tests pass"],
    ));
    plan
}

fn fanout(task: &str, tier: ComplexityTier, settings: &GeneratorSettings) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PlanPattern::Fanout, tier, task);
    let mut subtasks = split_subtasks(task);
    let cap = settings.max_parallel_agents.max(1);

    // Fold the overflow into the last worker rather than dropping it
    if subtasks.len() > cap {
        let overflow = subtasks.split_off(cap - 1);
        subtasks.push(overflow.join("; "));
    }

    let mut parallel = Phase::new("parallel");
    for (i, subtask) in subtasks.iter().enumerate() {
        let domain = infer_domain(subtask);
        parallel = parallel.with_agent(AgentSpec::new(
            AgentRole::Implementer,
            domain,
            format!(
                "Work only on this part, independently of the others: {}",
                subtask
            ),
            format!("worktrees/{}-{}", domain, i + 1),
        ));
    }
    plan.phases.push(parallel);

    plan.phases.push(
        Phase::new("integration")
            .with_agent(AgentSpec::new(
                AgentRole::Integrator,
                infer_domain(task),
                format!("Merge the parallel results and resolve conflicts for: {}", task),
                ".",
            ))
            .after(["parallel"]),
    );

    plan.quality_gates.insert(QualityGate::new(
        "integration-consistency",
        "integration",
        &["parallel changes merge cleanly", "full test suite passes"],
    ));
    plan
}

fn tournament(task: &str, tier: ComplexityTier, settings: &GeneratorSettings) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PlanPattern::Tournament, tier, task);
    let domain = infer_domain(task);

    let candidates: Vec<String> = (1..=settings.tournament_candidates)
        .map(|i| format!("candidate-{}", i))
        .collect();
    for (i, name) in candidates.iter().enumerate() {
        plan.phases.push(Phase::new(name.as_str()).with_agent(AgentSpec::new(
            AgentRole::Implementer,
            domain,
            format!(
                "Produce solution candidate {} for: {}. Work independently and do not look at other candidates.",
                i + 1,
                task
            ),
            format!("candidates/{}", name),
        )));
    }

    plan.phases.push(
        Phase::new("critique")
            .with_agent(AgentSpec::new(
                AgentRole::Critic,
                domain,
                format!(
                    "Compare all {} candidates for: {}. Rank them and justify the winner.",
                    candidates.len(),
                    task
                ),
                ".",
            ))
            .after(candidates.iter().cloned()),
    );

    plan.phases.push(
        Phase::new("selection")
            .with_agent(AgentSpec::new(
                AgentRole::Integrator,
                domain,
                "Adopt the winning candidate and fold in the best ideas from the others.",
                ".",
            ))
            .with_agent(AgentSpec::new(
                AgentRole::Tester,
                "testing",
                format!("Verify the selected solution for: {}", task),
                ".",
            ))
            .after(["critique"]),
    );

    plan.quality_gates.insert(QualityGate::new(
        "critique-coverage",
        "critique",
        &["every candidate evaluated", "ranking criteria stated"],
    ));
    plan.quality_gates.insert(QualityGate::new(
        "testing-adequacy",
        "selection",
        &["selected solution covered by tests"],
    ));
    plan
}

fn gate_for(kind: PhaseKind) -> QualityGate {
    let name = kind.name();
    match kind {
        PhaseKind::Discovery => QualityGate::new(
            "discovery-coverage",
            name,
            &["affected components identified", "risks listed"],
        ),
        PhaseKind::Design => QualityGate::new(
            "design-completeness",
            name,
            &["interfaces defined", "data flow described", "open questions resolved"],
        ),
        PhaseKind::Implementation => QualityGate::new(
            "implementation-review",
            name,
            &["code follows the design", "no unrelated changes"],
        ),
        PhaseKind::Validation => QualityGate::new(
            "testing-adequacy",
            name,
            &["new behaviour covered by tests", "edge cases exercised", "suite passes"],
        ),
        PhaseKind::Refinement => QualityGate::new(
            "refinement-signoff",
            name,
            &["review findings addressed", "documentation updated"],
        ),
    }
}

fn hierarchical(task: &str, tier: ComplexityTier) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PlanPattern::Hierarchical, tier, task);
    let domain = infer_domain(task);

    let mut previous: Option<&'static str> = None;
    for kind in phase_chain(task) {
        let mut phase = Phase::new(kind.name()).with_agent(AgentSpec::new(
            kind.lead_role(),
            domain,
            kind.instructions(task),
            ".",
        ));
        match kind {
            PhaseKind::Validation => {
                phase = phase.with_agent(AgentSpec::new(
                    AgentRole::Reviewer,
                    domain,
                    format!("Review the changes made for: {}", task),
                    ".",
                ));
            }
            PhaseKind::Refinement => {
                phase = phase.with_agent(AgentSpec::new(
                    AgentRole::Documenter,
                    "documentation",
                    format!("Document the outcome of: {}", task),
                    ".",
                ));
            }
            _ => {}
        }
        if let Some(prev) = previous {
            phase = phase.after([prev]);
        }
        plan.phases.push(phase);
        plan.quality_gates.insert(gate_for(kind));
        previous = Some(kind.name());
    }
    plan
}
