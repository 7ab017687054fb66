//! Triage types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Complexity tier of a task, ordered from least to most complex
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    /// Single well-scoped change
    Simple,
    /// A few related changes
    Medium,
    /// Cross-cutting work needing design
    Complex,
    /// Large multi-phase effort
    VeryComplex,
}

impl ComplexityTier {
    pub fn all() -> &'static [ComplexityTier] {
        &[
            ComplexityTier::Simple,
            ComplexityTier::Medium,
            ComplexityTier::Complex,
            ComplexityTier::VeryComplex,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityTier::Simple => "simple",
            ComplexityTier::Medium => "medium",
            ComplexityTier::Complex => "complex",
            ComplexityTier::VeryComplex => "very_complex",
        }
    }

    /// Complex work always goes through the full planning engine;
    /// simpler tiers may be served by a pre-built template.
    pub fn requires_full_planning(&self) -> bool {
        matches!(self, ComplexityTier::Complex | ComplexityTier::VeryComplex)
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplexityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        ComplexityTier::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown complexity tier: {}", s))
    }
}

/// One independent complexity assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageVote {
    pub tier: ComplexityTier,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub rationale: String,
}

impl TriageVote {
    pub fn new(tier: ComplexityTier, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            tier,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: rationale.into(),
        }
    }
}

/// Reduced result of a set of votes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageConsensus {
    pub tier: ComplexityTier,
    pub votes: Vec<TriageVote>,
    /// Share of votes cast for the winning tier
    pub agreement_ratio: f64,
}
