//! End-to-end tests of the daemon HTTP API

use super::common::*;
use anyhow::Result;
use conductor::daemon::{ClientError, LifecycleState};
use conductor::hooks::{HookKind, BLOCK_EXIT_CODE};
use conductor::planning::PlanPattern;
use conductor::triage::ComplexityTier;

#[tokio::test]
async fn test_live_and_health() -> Result<()> {
    let daemon = TestDaemon::start().await?;

    assert!(daemon.client.is_running().await);
    assert_eq!(daemon.client.live_pid().await, Some(std::process::id()));

    let health = daemon.client.health().await?;
    assert_eq!(health.status, "ok");
    assert_eq!(health.state, LifecycleState::Running);
    assert_eq!(health.active_agents, 0);
    assert_eq!(health.locked_files, 0);
    assert_eq!(health.cache.backend, "memory");
    // The two probes above were counted
    assert!(health.total_requests >= 2);

    Ok(())
}

#[tokio::test]
async fn test_file_register_conflict_and_release() -> Result<()> {
    let daemon = TestDaemon::start().await?;
    let client = &daemon.client;

    let first = client.register_file("agent-a", Some("s-1"), "src/lib.rs").await?;
    assert!(first.acquired);
    assert!(first.holder.is_none());

    let second = client.register_file("agent-b", None, "./src/lib.rs").await?;
    assert!(!second.acquired);
    assert_eq!(second.holder.as_deref(), Some("agent-a"));

    // Releasing someone else's lock does nothing
    assert!(!client.unregister_file("agent-b", "src/lib.rs").await?.released);
    assert!(client.unregister_file("agent-a", "src/lib.rs").await?.released);
    assert!(client.register_file("agent-b", None, "src/lib.rs").await?.acquired);

    let health = client.health().await?;
    assert_eq!(health.active_agents, 2);
    assert_eq!(health.locked_files, 1);

    Ok(())
}

#[tokio::test]
async fn test_empty_fields_are_rejected() -> Result<()> {
    let daemon = TestDaemon::start().await?;

    let err = daemon.client.register_file("", None, "src/lib.rs").await.unwrap_err();
    match err {
        ClientError::Status { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code, "MISSING_FIELD");
        }
        other => panic!("unexpected error: {}", other),
    }

    let health = daemon.client.health().await?;
    assert!(health.total_errors >= 1);

    Ok(())
}

#[tokio::test]
async fn test_share_and_cleanup() -> Result<()> {
    let daemon = TestDaemon::start().await?;
    let client = &daemon.client;

    client.register_file("agent-a", None, "src/a.rs").await?;
    client.register_file("agent-a", None, "src/b.rs").await?;
    let artifact_id = client.share_result("agent-a", "Refactored the parser").await?;
    assert!(!artifact_id.is_empty());

    let released = client.cleanup_agent("agent-a").await?;
    assert_eq!(released.len(), 2);

    let snapshot = client.agents().await?;
    assert!(snapshot.agents.is_empty());
    // Artifacts outlive the agent that shared them
    assert_eq!(snapshot.artifact_count, 1);

    // Cleaning up twice is a no-op
    assert!(client.cleanup_agent("agent-a").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_duplicate_spawn_is_blocked_over_http() -> Result<()> {
    let daemon = TestDaemon::start().await?;
    let client = &daemon.client;
    let task = "Implement the user login page with email and password validation";

    let first = client
        .try_process_hook(HookKind::PreAgentSpawn, &spawn_payload("agent-a", task))
        .await?;
    assert!(first.proceed);

    let second = client
        .process_hook(HookKind::PreAgentSpawn, &spawn_payload("agent-b", task))
        .await;
    assert!(!second.proceed);
    assert!(!second.is_degraded());
    assert_eq!(second.exit_code(), BLOCK_EXIT_CODE);
    assert_eq!(second.metadata["duplicate_of"]["agent_id"], "agent-a");

    Ok(())
}

#[tokio::test]
async fn test_unknown_hook_kind_is_a_bad_request() -> Result<()> {
    let daemon = TestDaemon::start().await?;

    let response = reqwest::Client::new()
        .post(format!("{}/api/hooks/pre_teleport", daemon.client.base_url()))
        .json(&serde_json::json!({}))
        .send()
        .await?;
    assert_eq!(response.status().as_u16(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "UNKNOWN_HOOK");

    Ok(())
}

#[tokio::test]
async fn test_triage_and_plan_endpoints() -> Result<()> {
    let daemon = TestDaemon::start().await?;
    let client = &daemon.client;

    let consensus = client.triage("Fix typo in README").await?;
    assert!(!consensus.votes.is_empty());
    assert!(consensus.tier <= ComplexityTier::Medium);

    let task = "Add rate limiting to the API gateway";
    let outcome = client.plan(task, Some(PlanPattern::Tournament)).await?;
    assert_eq!(outcome.plan.pattern, PlanPattern::Tournament);
    assert!(outcome.plan.validate().is_ok());
    assert!(!outcome.plan_from_cache);

    let again = client.plan(task, Some(PlanPattern::Tournament)).await?;
    assert!(again.plan_from_cache);
    assert_eq!(again.plan, outcome.plan);

    let stats = client.cache_stats().await?;
    assert!(stats.hits >= 1);

    Ok(())
}

#[tokio::test]
async fn test_empty_task_is_rejected() -> Result<()> {
    let daemon = TestDaemon::start().await?;

    match daemon.client.plan("   ", None).await {
        Err(ClientError::Status { status, code, .. }) => {
            assert_eq!(status, 400);
            assert_eq!(code, "EMPTY_TASK");
        }
        other => panic!("expected EMPTY_TASK, got {:?}", other.map(|o| o.plan.pattern)),
    }

    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_server() -> Result<()> {
    let daemon = TestDaemon::start().await?;
    let client = daemon.client.clone();

    client.shutdown().await?;
    daemon.join().await?;

    assert!(!client.is_running().await);
    Ok(())
}
