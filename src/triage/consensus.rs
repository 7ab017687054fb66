//! Vote reduction
//!
//! A strict majority wins. Without one, the highest tier that received
//! any vote wins, so disagreement always escalates.

use std::collections::BTreeMap;

use super::types::{ComplexityTier, TriageConsensus, TriageVote};

/// Tier used when no assessment produced a vote
pub const FALLBACK_TIER: ComplexityTier = ComplexityTier::Complex;

pub fn reduce(votes: Vec<TriageVote>) -> TriageConsensus {
    if votes.is_empty() {
        return TriageConsensus {
            tier: FALLBACK_TIER,
            votes,
            agreement_ratio: 0.0,
        };
    }

    let mut tally: BTreeMap<ComplexityTier, usize> = BTreeMap::new();
    for vote in &votes {
        *tally.entry(vote.tier).or_insert(0) += 1;
    }

    let total = votes.len();
    let majority = tally
        .iter()
        .find(|(_, count)| **count * 2 > total)
        .map(|(tier, count)| (*tier, *count));

    // BTreeMap iterates in tier order, so the last entry is the highest
    let (tier, count) = match majority {
        Some(winner) => winner,
        None => tally
            .iter()
            .next_back()
            .map(|(tier, count)| (*tier, *count))
            .unwrap_or((FALLBACK_TIER, 0)),
    };

    TriageConsensus {
        tier,
        votes,
        agreement_ratio: count as f64 / total as f64,
    }
}
