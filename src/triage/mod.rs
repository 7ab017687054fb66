//! Complexity Triage
//!
//! Decides how much planning a task needs by majority vote over several
//! independent assessments, escalating whenever the votes disagree.

pub mod assessor;
pub mod consensus;
pub mod engine;
pub mod types;

pub use assessor::{
    heuristic_assessors, Assessor, CompletionClient, KeywordAssessor, ModelAssessor,
    ScopeAssessor, StructureAssessor,
};
pub use consensus::reduce;
pub use engine::TriageEngine;
pub use types::{ComplexityTier, TriageConsensus, TriageVote};
