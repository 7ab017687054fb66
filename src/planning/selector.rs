//! Pattern selection
//!
//! Table-driven on the consensus tier and a few keyword signals:
//!
//! | tier         | tournament signal | fanout signal | otherwise    |
//! |--------------|-------------------|---------------|--------------|
//! | simple       | direct            | fanout        | direct       |
//! | medium       | tournament        | fanout        | direct       |
//! | complex      | tournament        | fanout*       | hierarchical |
//! | very_complex | tournament        | hierarchical  | hierarchical |
//!
//! *only when fewer than two dependent phases were detected.

use super::phases::detect_phases;
use super::types::{PlanComposition, PlanPattern};
use crate::triage::ComplexityTier;
use crate::utils::{contains_any, normalize_text};

const TOURNAMENT_SIGNALS: &[&str] = &[
    "compare",
    "alternative",
    "options for",
    "best approach",
    "best way",
    "evaluate",
    "competing",
    "trade-off",
    "tradeoff",
    "which is better",
    "prototype several",
];

const FANOUT_SIGNALS: &[&str] = &[
    "in parallel",
    "independent",
    "each of",
    "for each",
    "every ",
    "all of the",
    "separately",
    "across all",
];

/// Chooses a generation pattern for a task
pub trait PatternSelector: Send + Sync {
    fn select(&self, task: &str, tier: ComplexityTier) -> PlanComposition;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordPatternSelector;

impl PatternSelector for KeywordPatternSelector {
    fn select(&self, task: &str, tier: ComplexityTier) -> PlanComposition {
        let text = normalize_text(task);
        let detected_phases = detect_phases(task);
        let tournament = contains_any(&text, TOURNAMENT_SIGNALS);
        let fanout = contains_any(&text, FANOUT_SIGNALS)
            || super::generators::split_subtasks(task).len() >= 2;

        let (pattern, rationale) = match tier {
            ComplexityTier::Simple if fanout => {
                (PlanPattern::Fanout, "small task over independent parts")
            }
            ComplexityTier::Simple => (PlanPattern::Direct, "single well-scoped change"),
            ComplexityTier::Medium if tournament => {
                (PlanPattern::Tournament, "competing approaches should be weighed")
            }
            ComplexityTier::Medium if fanout => {
                (PlanPattern::Fanout, "independent subtasks can run in parallel")
            }
            ComplexityTier::Medium => (PlanPattern::Direct, "contained feature work"),
            ComplexityTier::Complex if tournament => {
                (PlanPattern::Tournament, "competing approaches should be weighed")
            }
            ComplexityTier::Complex if fanout && detected_phases.len() < 2 => {
                (PlanPattern::Fanout, "independent subtasks can run in parallel")
            }
            ComplexityTier::Complex => {
                (PlanPattern::Hierarchical, "work decomposes into dependent phases")
            }
            ComplexityTier::VeryComplex if tournament => {
                (PlanPattern::Tournament, "competing approaches should be weighed")
            }
            ComplexityTier::VeryComplex => {
                (PlanPattern::Hierarchical, "large effort needs staged phases")
            }
        };

        PlanComposition {
            pattern,
            tier,
            rationale: rationale.to_string(),
            detected_phases,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(task: &str, tier: ComplexityTier) -> PlanPattern {
        KeywordPatternSelector.select(task, tier).pattern
    }

    #[test]
    fn test_simple_tasks() {
        assert_eq!(select("Fix typo in README", ComplexityTier::Simple), PlanPattern::Direct);
        assert_eq!(
            select("Bump the version in every crate", ComplexityTier::Simple),
            PlanPattern::Fanout
        );
    }

    #[test]
    fn test_tournament_signal() {
        assert_eq!(
            select("Compare caching strategies for the feed", ComplexityTier::Medium),
            PlanPattern::Tournament
        );
        assert_eq!(
            select("Evaluate the best approach to sharding", ComplexityTier::VeryComplex),
            PlanPattern::Tournament
        );
        // Simple work never runs a tournament
        assert_eq!(
            select("Compare two log lines", ComplexityTier::Simple),
            PlanPattern::Direct
        );
    }

    #[test]
    fn test_complex_defaults_to_hierarchical() {
        let composition = KeywordPatternSelector.select(
            "Research the current auth flow, design token rotation and implement it",
            ComplexityTier::Complex,
        );
        assert_eq!(composition.pattern, PlanPattern::Hierarchical);
        assert!(composition.detected_phases.len() >= 2);
    }

    #[test]
    fn test_complex_fanout_when_flat() {
        assert_eq!(
            select("Upgrade logging in each of the services separately", ComplexityTier::Complex),
            PlanPattern::Fanout
        );
    }
}
