//! Triage Engine
//!
//! Runs a fixed number of independent assessments concurrently and
//! reduces them to a consensus tier. Results are cached by fingerprint.

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::assessor::{heuristic_assessors, Assessor};
use super::consensus::reduce;
use super::types::TriageConsensus;
use crate::cache::{fingerprint, CacheCategory, Cached, FingerprintCache};
use crate::utils::normalize_text;

#[derive(Serialize)]
struct TriageRequest<'a> {
    task: &'a str,
    votes: usize,
    assessors: Vec<&'a str>,
}

#[derive(Debug, thiserror::Error)]
#[error("no assessor produced a vote")]
struct NoVotes;

pub struct TriageEngine {
    assessors: Vec<Arc<dyn Assessor>>,
    votes: usize,
    cache: Arc<FingerprintCache>,
    ttl: Duration,
}

impl TriageEngine {
    /// Engine using the built-in heuristic assessors
    pub fn new(cache: Arc<FingerprintCache>, votes: usize, ttl: Duration) -> Self {
        Self {
            assessors: heuristic_assessors(),
            votes: votes.max(1),
            cache,
            ttl,
        }
    }

    /// Replace the assessors. Votes are assigned round-robin.
    pub fn with_assessors(mut self, assessors: Vec<Arc<dyn Assessor>>) -> Self {
        self.assessors = assessors;
        self
    }

    /// Consensus for `task`, served from cache when available
    pub async fn triage(&self, task: &str) -> Result<Cached<TriageConsensus>> {
        let normalized = normalize_text(task);
        let request = TriageRequest {
            task: &normalized,
            votes: self.votes,
            assessors: self.assessors.iter().map(|a| a.name()).collect(),
        };
        let key = self
            .cache
            .key(CacheCategory::Triage, &fingerprint(&request)?);

        let result = self
            .cache
            .get_or_compute(&key, self.ttl, || async {
                let consensus = self.assess(task).await;
                if consensus.votes.is_empty() {
                    // Vote-less escalations stay out of the cache
                    return Err(anyhow::Error::new(NoVotes));
                }
                Ok::<_, anyhow::Error>(consensus)
            })
            .await;

        match result {
            Err(e) if e.is::<NoVotes>() => {
                tracing::warn!("Every assessor failed; escalating without caching");
                Ok(Cached {
                    value: reduce(Vec::new()),
                    from_cache: false,
                })
            }
            other => other,
        }
    }

    /// Run every vote without consulting the cache
    pub async fn assess(&self, task: &str) -> TriageConsensus {
        if self.assessors.is_empty() {
            tracing::warn!("No complexity assessors configured; escalating");
            return reduce(Vec::new());
        }

        let assessments = (0..self.votes).map(|i| {
            let assessor = Arc::clone(&self.assessors[i % self.assessors.len()]);
            async move {
                let result = assessor.assess(task).await;
                (assessor, result)
            }
        });

        let mut votes = Vec::with_capacity(self.votes);
        for (assessor, result) in join_all(assessments).await {
            match result {
                Ok(vote) => votes.push(vote),
                Err(e) => tracing::warn!("Assessor {} failed: {}", assessor.name(), e),
            }
        }

        let consensus = reduce(votes);
        tracing::debug!(
            "Triage: {} ({} votes, agreement {:.2})",
            consensus.tier,
            consensus.votes.len(),
            consensus.agreement_ratio
        );
        consensus
    }
}
