//! Task Planning Module
//!
//! Compiles a task into an execution plan of phases, agent specs and
//! quality gates using one of four generation patterns.

pub mod engine;
pub mod generators;
pub mod phases;
pub mod selector;
pub mod templates;
pub mod types;

pub use engine::PlanningEngine;
pub use generators::{generate, split_subtasks, GeneratorSettings};
pub use phases::{detect_phases, PhaseKind};
pub use selector::{KeywordPatternSelector, PatternSelector};
pub use templates::{match_template, TaskTemplate, TEMPLATES};
pub use types::{
    AgentRole, AgentSpec, ExecutionPlan, Phase, PlanComposition, PlanOutcome, PlanPattern,
    QualityGate, TaskPlanOutcome,
};
