//! Pre-built plans for simple and medium tasks
//!
//! Tasks below the full-planning gate that match a template skip pattern
//! selection entirely.

use super::generators::infer_domain;
use super::types::{AgentRole, AgentSpec, ExecutionPlan, Phase, PlanPattern, QualityGate};
use crate::triage::ComplexityTier;
use crate::utils::{contains_any, normalize_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    QuickFix,
    DocsUpdate,
    TestAddition,
    SmallFeature,
}

pub struct TaskTemplate {
    pub kind: TemplateKind,
    pub name: &'static str,
    keywords: &'static [&'static str],
    /// Highest tier the template is suitable for
    max_tier: ComplexityTier,
}

/// Checked in order; the first match wins
pub const TEMPLATES: &[TaskTemplate] = &[
    TaskTemplate {
        kind: TemplateKind::DocsUpdate,
        name: "docs-update",
        keywords: &["readme", "docs", "documentation", "docstring", "changelog", "comment"],
        max_tier: ComplexityTier::Medium,
    },
    TaskTemplate {
        kind: TemplateKind::TestAddition,
        name: "test-addition",
        keywords: &[
            "add test",
            "add a test",
            "unit test",
            "test coverage",
            "tests for",
            "write tests",
        ],
        max_tier: ComplexityTier::Medium,
    },
    TaskTemplate {
        kind: TemplateKind::QuickFix,
        name: "quick-fix",
        keywords: &["fix", "bug", "typo", "crash", "error message", "off-by-one"],
        max_tier: ComplexityTier::Medium,
    },
    TaskTemplate {
        kind: TemplateKind::SmallFeature,
        name: "small-feature",
        keywords: &["add ", "implement", "support", "option", "flag", "endpoint"],
        max_tier: ComplexityTier::Medium,
    },
];

/// The template for `task`, if any applies at `tier`
pub fn match_template(task: &str, tier: ComplexityTier) -> Option<&'static TaskTemplate> {
    let text = normalize_text(task);
    TEMPLATES
        .iter()
        .find(|t| tier <= t.max_tier && contains_any(&text, t.keywords))
}

impl TaskTemplate {
    pub fn instantiate(&self, task: &str, tier: ComplexityTier) -> ExecutionPlan {
        let task = task.trim();
        let domain = infer_domain(task);
        let mut plan = ExecutionPlan::new(PlanPattern::Direct, tier, task);

        match self.kind {
            TemplateKind::QuickFix => {
                plan.phases.push(Phase::new("fix").with_agent(AgentSpec::new(
                    AgentRole::Implementer,
                    domain,
                    format!("Reproduce the problem, then apply the smallest fix for: {}", task),
                    ".",
                )));
                plan.phases.push(
                    Phase::new("verify")
                        .with_agent(AgentSpec::new(
                            AgentRole::Tester,
                            "testing",
                            "Add a regression test for the fix and run the affected tests.",
                            ".",
                        ))
                        .after(["fix"]),
                );
                plan.quality_gates.insert(QualityGate::new(
                    "regression-covered",
                    "verify",
                    &["failing case now passes", "regression test added"],
                ));
            }
            TemplateKind::DocsUpdate => {
                plan.phases.push(Phase::new("write").with_agent(AgentSpec::new(
                    AgentRole::Documenter,
                    "documentation",
                    format!("Update the documentation: {}", task),
                    ".",
                )));
                plan.quality_gates.insert(QualityGate::new(
                    "docs-accuracy",
                    "write",
                    &["matches current behaviour", "examples run"],
                ));
            }
            TemplateKind::TestAddition => {
                plan.phases.push(Phase::new("test").with_agent(AgentSpec::new(
                    AgentRole::Tester,
                    "testing",
                    format!("Write the tests requested: {}", task),
                    ".",
                )));
                plan.quality_gates.insert(QualityGate::new(
                    "testing-adequacy",
                    "test",
                    &["edge cases exercised", "tests pass"],
                ));
            }
            TemplateKind::SmallFeature => {
                plan.phases.push(Phase::new("implement").with_agent(AgentSpec::new(
                    AgentRole::Implementer,
                    domain,
                    format!("Implement: {}", task),
                    ".",
                )));
                plan.phases.push(
                    Phase::new("review")
                        .with_agent(AgentSpec::new(
                            AgentRole::Tester,
                            "testing",
                            "Cover the new behaviour with tests.",
                            ".",
                        ))
                        .with_agent(AgentSpec::new(
                            AgentRole::Reviewer,
                            domain,
                            "Review the change for scope and clarity.",
                            ".",
                        ))
                        .after(["implement"]),
                );
                plan.quality_gates.insert(QualityGate::new(
                    "testing-adequacy",
                    "review",
                    &["new behaviour covered by tests"],
                ));
            }
        }
        plan
    }
}
