//! Triage and planning pipeline with pluggable assessors

use super::common::*;
use anyhow::Result;
use async_trait::async_trait;
use conductor::planning::{AgentRole, PlanPattern, PlanningEngine};
use conductor::triage::{Assessor, CompletionClient, ComplexityTier, ModelAssessor, TriageEngine};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Completion client that always answers with the same text
struct ScriptedClient {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn engine_with_model(client: Arc<ScriptedClient>) -> PlanningEngine {
    let config = test_config();
    let cache = memory_cache();
    let assessor: Arc<dyn Assessor> = Arc::new(ModelAssessor::new(client));
    let triage = TriageEngine::new(cache.clone(), 3, Duration::from_secs(60))
        .with_assessors(vec![assessor]);
    PlanningEngine::new(cache, Arc::new(triage), &config)
}

#[tokio::test]
async fn test_model_votes_drive_full_planning() -> Result<()> {
    let client = ScriptedClient::new(
        "```json\n{\"tier\": \"very_complex\", \"confidence\": 0.9, \"rationale\": \"cross-cutting\"}\n```",
    );
    let engine = engine_with_model(client.clone());

    // "fix" would match a template if the tier allowed it
    let outcome = engine
        .plan_task("Fix the authentication flow across all services", None)
        .await?;

    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    assert_eq!(outcome.consensus.tier, ComplexityTier::VeryComplex);
    assert_eq!(outcome.consensus.agreement_ratio, 1.0);
    assert!(outcome.template.is_none());
    assert_eq!(outcome.plan.pattern, PlanPattern::Hierarchical);
    assert!(outcome.plan.validate().is_ok());
    Ok(())
}

#[tokio::test]
async fn test_unparseable_model_output_escalates() -> Result<()> {
    let client = ScriptedClient::new("I think this is pretty easy!");
    let engine = engine_with_model(client);

    let outcome = engine.plan_task("Fix typo in README", None).await?;

    // No usable votes: conservative fallback, and no template shortcut
    assert!(outcome.consensus.votes.is_empty());
    assert_eq!(outcome.consensus.tier, ComplexityTier::Complex);
    assert!(outcome.template.is_none());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_identical_requests_agree() -> Result<()> {
    let client = ScriptedClient::new(r#"{"tier": "complex", "confidence": 0.7, "rationale": "r"}"#);
    let engine = engine_with_model(client.clone());
    let task = "Compare two caching strategies for the search API";

    let outcomes = join_all((0..6).map(|_| engine.plan_task(task, None))).await;
    let plans: Vec<_> = outcomes.into_iter().collect::<Result<Vec<_>>>()?;

    // One triage round despite six callers
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    assert!(plans.iter().all(|o| o.plan == plans[0].plan));
    assert_eq!(plans[0].plan.pattern, PlanPattern::Tournament);
    assert_eq!(plans.iter().filter(|o| !o.plan_from_cache).count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_fanout_plan_has_integrator() -> Result<()> {
    let engine = PlanningEngine::from_config(memory_cache(), &test_config());
    let task = "Update the API docs, the CLI docs and the admin guide";

    let outcome = engine.plan_task(task, Some(PlanPattern::Fanout)).await?;
    let plan = &outcome.plan;

    assert_eq!(plan.pattern, PlanPattern::Fanout);
    let parallel = plan.phase("parallel").expect("parallel phase");
    assert_eq!(parallel.agent_specs.len(), 3);
    let integration = plan.phase("integration").expect("integration phase");
    assert!(integration.depends_on.contains("parallel"));
    assert!(integration
        .agent_specs
        .iter()
        .any(|spec| spec.role == AgentRole::Integrator));
    Ok(())
}
