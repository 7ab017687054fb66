//! Degraded mode for the CLI
//!
//! `plan` and `triage` ask the daemon first. Any client failure, whether
//! the daemon is down, slow, or answering with errors, falls back to an
//! in-process engine over a private memory cache.

use anyhow::Result;
use std::sync::Arc;

use super::client::DaemonClient;
use crate::cache::{FingerprintCache, KeySpace, MemoryCache};
use crate::config::Config;
use crate::planning::{PlanPattern, PlanningEngine, TaskPlanOutcome};
use crate::triage::TriageConsensus;

/// Planning engine over an in-process memory cache
pub fn local_planner(config: &Config) -> PlanningEngine {
    let store = Arc::new(MemoryCache::new(config.cache.memory_max_entries));
    let keys = KeySpace::new(config.cache.key_prefix.clone(), config.cache.key_version.clone());
    let cache = Arc::new(FingerprintCache::new(store, keys));
    PlanningEngine::from_config(cache, config)
}

pub async fn plan(
    client: &DaemonClient,
    config: &Config,
    task: &str,
    pattern: Option<PlanPattern>,
) -> Result<TaskPlanOutcome> {
    match client.plan(task, pattern).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::warn!("Daemon {} error, planning locally: {}", e.kind(), e);
            local_planner(config).plan_task(task, pattern).await
        }
    }
}

pub async fn triage(client: &DaemonClient, config: &Config, task: &str) -> Result<TriageConsensus> {
    match client.triage(task).await {
        Ok(consensus) => Ok(consensus),
        Err(e) => {
            tracing::warn!("Daemon {} error, triaging locally: {}", e.kind(), e);
            Ok(local_planner(config).triage().triage(task).await?.value)
        }
    }
}
