//! Multi-agent scenarios through the hook router

use super::common::*;
use conductor::coordination::CoordinationRegistry;
use conductor::hooks::{
    AuditLog, AuditRecord, DangerousCommandDetector, HookKind, HookPayload, HookRouter, ToolInput,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

fn router_with_audit() -> (HookRouter, UnboundedReceiver<AuditRecord>) {
    let (audit, rx) = AuditLog::channel();
    let router = HookRouter::new(
        Arc::new(CoordinationRegistry::default()),
        DangerousCommandDetector::default(),
        audit,
    );
    (router, rx)
}

#[tokio::test]
async fn test_two_agents_share_a_workspace() {
    let (router, mut audit) = router_with_audit();

    // Agent A claims a task and a file
    let spawn_a = router
        .route(
            HookKind::PreAgentSpawn,
            &spawn_payload("agent-a", "Write integration tests for the billing service"),
        )
        .await;
    assert!(spawn_a.proceed);
    let edit_a = router.route(HookKind::PreEdit, &edit_payload("agent-a", "src/billing.rs")).await;
    assert_eq!(edit_a.metadata["locked"], json!(["src/billing.rs"]));

    // Agent B takes an unrelated task but touches the same file
    let spawn_b = router
        .route(
            HookKind::PreAgentSpawn,
            &spawn_payload("agent-b", "Update the changelog for release 2.3"),
        )
        .await;
    assert!(spawn_b.proceed);
    let edit_b = router.route(HookKind::PreEdit, &edit_payload("agent-b", "src/billing.rs")).await;
    assert!(edit_b.proceed);
    assert_eq!(edit_b.metadata["conflicts"][0]["holder"], "agent-a");

    // A finishes and shares its output; B inherits it on the next spawn
    let mut done = agent_payload("agent-a");
    done.tool_response = Some(json!("Added 12 tests covering invoice rounding"));
    let post = router.route(HookKind::PostAgentSpawn, &done).await;
    assert!(post.metadata.contains_key("artifact_id"));
    assert_eq!(post.metadata["released"], json!(["src/billing.rs"]));

    let edit_b = router.route(HookKind::PreEdit, &edit_payload("agent-b", "src/billing.rs")).await;
    assert_eq!(edit_b.metadata["locked"], json!(["src/billing.rs"]));

    let respawn_b = router
        .route(HookKind::PreAgentSpawn, &spawn_payload("agent-b", "Review the billing tests"))
        .await;
    let shared = respawn_b.metadata["shared_context"].as_array().cloned().unwrap_or_default();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["agent_id"], "agent-a");

    // Every event was audited, in order
    let mut kinds = Vec::new();
    while let Ok(record) = audit.try_recv() {
        kinds.push(record.hook);
    }
    assert_eq!(
        kinds,
        vec![
            HookKind::PreAgentSpawn,
            HookKind::PreEdit,
            HookKind::PreAgentSpawn,
            HookKind::PreEdit,
            HookKind::PostAgentSpawn,
            HookKind::PreEdit,
            HookKind::PreAgentSpawn,
        ]
    );
}

#[tokio::test]
async fn test_duplicate_is_released_after_cleanup() {
    let (router, _audit) = router_with_audit();
    let task = "Migrate the session store from cookies to Redis";

    assert!(router.route(HookKind::PreAgentSpawn, &spawn_payload("agent-a", task)).await.proceed);
    assert!(!router.route(HookKind::PreAgentSpawn, &spawn_payload("agent-b", task)).await.proceed);

    router.route(HookKind::PostAgentSpawn, &agent_payload("agent-a")).await;
    assert!(router.route(HookKind::PreAgentSpawn, &spawn_payload("agent-b", task)).await.proceed);
}

#[tokio::test]
async fn test_dangerous_command_never_blocks() {
    let (router, _audit) = router_with_audit();
    let payload = HookPayload {
        session_id: Some("session-9".to_string()),
        tool_name: Some("Bash".to_string()),
        tool_input: ToolInput {
            command: Some("git push --force origin main".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    let decision = router.route(HookKind::PreCommand, &payload).await;
    assert!(decision.proceed);
    assert_eq!(decision.exit_code(), 0);
    assert_eq!(decision.metadata["dangerous"], true);
    // Session id stands in for a missing agent id
    assert_eq!(router.registry().active_agents().await, 1);
}
