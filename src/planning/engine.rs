//! Planning Engine
//!
//! Ties triage, pattern selection, templates and generation together.
//! Every step that produces a result goes through the fingerprint cache.

use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::generators::{generate, GeneratorSettings};
use super::selector::{KeywordPatternSelector, PatternSelector};
use super::templates::match_template;
use super::types::{
    ExecutionPlan, PlanComposition, PlanOutcome, PlanPattern, TaskPlanOutcome,
};
use crate::cache::{fingerprint, CacheCategory, Cached, FingerprintCache};
use crate::config::Config;
use crate::triage::{ComplexityTier, TriageConsensus, TriageEngine};
use crate::utils::normalize_text;

#[derive(Serialize)]
struct PlanRequest<'a> {
    task: &'a str,
    tier: ComplexityTier,
    pattern: PlanPattern,
}

#[derive(Serialize)]
struct CompositionRequest<'a> {
    task: &'a str,
    tier: ComplexityTier,
    pattern_override: Option<PlanPattern>,
}

#[derive(Serialize)]
struct TemplateRequest<'a> {
    template: &'a str,
    task: &'a str,
    tier: ComplexityTier,
}

/// Cache lifetimes per planning step
#[derive(Debug, Clone, Copy)]
struct PlanningTtls {
    plan: Duration,
    composition: Duration,
    template: Duration,
}

pub struct PlanningEngine {
    cache: Arc<FingerprintCache>,
    triage: Arc<TriageEngine>,
    selector: Arc<dyn PatternSelector>,
    settings: GeneratorSettings,
    ttls: PlanningTtls,
}

impl PlanningEngine {
    pub fn new(cache: Arc<FingerprintCache>, triage: Arc<TriageEngine>, config: &Config) -> Self {
        Self {
            cache,
            triage,
            selector: Arc::new(KeywordPatternSelector),
            settings: GeneratorSettings::from(&config.planning),
            ttls: PlanningTtls {
                plan: config.cache.ttl_for(CacheCategory::Planning),
                composition: config.cache.ttl_for(CacheCategory::Composition),
                template: config.cache.ttl_for(CacheCategory::SessionTemplate),
            },
        }
    }

    /// Build the engine and its triage engine over one shared cache
    pub fn from_config(cache: Arc<FingerprintCache>, config: &Config) -> Self {
        let triage = TriageEngine::new(
            cache.clone(),
            config.planning.triage_votes,
            config.cache.ttl_for(CacheCategory::Triage),
        );
        Self::new(cache, Arc::new(triage), config)
    }

    pub fn with_selector(mut self, selector: Arc<dyn PatternSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn triage(&self) -> &Arc<TriageEngine> {
        &self.triage
    }

    /// Compile `task` with `pattern` for the consensus tier.
    ///
    /// Keyed on the normalized task, tier and pattern, so an identical
    /// request within the TTL returns the same plan without regenerating.
    pub async fn generate_plan(
        &self,
        pattern: PlanPattern,
        task: &str,
        consensus: &TriageConsensus,
    ) -> Result<PlanOutcome> {
        let normalized = normalized_task(task)?;
        let tier = consensus.tier;
        let fp = fingerprint(&PlanRequest {
            task: &normalized,
            tier,
            pattern,
        })?;
        let key = self.cache.key(CacheCategory::Planning, &fp);

        let cached: Cached<ExecutionPlan> = self
            .cache
            .get_or_compute(&key, self.ttls.plan, || async {
                tracing::info!("Generating {} plan for {} task", pattern, tier);
                Ok(generate(pattern, task, tier, &self.settings))
            })
            .await?;

        Ok(PlanOutcome {
            plan: cached.value,
            from_cache: cached.from_cache,
            fingerprint: fp,
        })
    }

    /// Choose a pattern for `task`, honouring an explicit override
    pub async fn compose(
        &self,
        task: &str,
        tier: ComplexityTier,
        pattern_override: Option<PlanPattern>,
    ) -> Result<Cached<PlanComposition>> {
        let normalized = normalized_task(task)?;
        let fp = fingerprint(&CompositionRequest {
            task: &normalized,
            tier,
            pattern_override,
        })?;
        let key = self.cache.key(CacheCategory::Composition, &fp);

        self.cache
            .get_or_compute(&key, self.ttls.composition, || async {
                let mut composition = self.selector.select(task, tier);
                if let Some(pattern) = pattern_override {
                    composition.pattern = pattern;
                    composition.rationale = "pattern requested explicitly".to_string();
                }
                Ok(composition)
            })
            .await
    }

    /// Triage, then serve a template or a fully generated plan
    pub async fn plan_task(
        &self,
        task: &str,
        pattern_override: Option<PlanPattern>,
    ) -> Result<TaskPlanOutcome> {
        let normalized = normalized_task(task)?;
        let triage = self.triage.triage(task).await?;
        let consensus = triage.value;

        if pattern_override.is_none() && !consensus.tier.requires_full_planning() {
            if let Some(template) = match_template(task, consensus.tier) {
                let fp = fingerprint(&TemplateRequest {
                    template: template.name,
                    task: &normalized,
                    tier: consensus.tier,
                })?;
                let key = self.cache.key(CacheCategory::SessionTemplate, &fp);
                let tier = consensus.tier;
                let plan: Cached<ExecutionPlan> = self
                    .cache
                    .get_or_compute(&key, self.ttls.template, || async {
                        Ok(template.instantiate(task, tier))
                    })
                    .await?;

                tracing::info!("Using {} template for {} task", template.name, tier);
                return Ok(TaskPlanOutcome {
                    plan: plan.value,
                    consensus,
                    template: Some(template.name.to_string()),
                    triage_from_cache: triage.from_cache,
                    plan_from_cache: plan.from_cache,
                });
            }
        }

        let composition = self
            .compose(task, consensus.tier, pattern_override)
            .await?
            .value;
        tracing::debug!("Selected {} pattern: {}", composition.pattern, composition.rationale);

        let outcome = self
            .generate_plan(composition.pattern, task, &consensus)
            .await?;

        Ok(TaskPlanOutcome {
            plan: outcome.plan,
            consensus,
            template: None,
            triage_from_cache: triage.from_cache,
            plan_from_cache: outcome.from_cache,
        })
    }
}

fn normalized_task(task: &str) -> Result<String> {
    let normalized = normalize_text(task);
    if normalized.is_empty() {
        bail!("Task description is empty");
    }
    Ok(normalized)
}
