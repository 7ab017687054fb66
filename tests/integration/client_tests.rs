//! Daemon client against a mocked server

use super::common::*;
use anyhow::Result;
use conductor::daemon::{fallback, ClientError, DaemonClient};
use conductor::hooks::HookKind;
use conductor::triage::ComplexityTier;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> DaemonClient {
    DaemonClient::new(server.uri(), Duration::from_millis(500))
}

#[tokio::test]
async fn test_hook_decision_is_passed_through() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/hooks/pre_edit"))
        .and(body_partial_json(json!({ "agent_id": "agent-a" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "proceed": true,
            "hook": "pre_edit",
            "metadata": { "locked": ["src/lib.rs"] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let decision = client_for(&server)
        .process_hook(HookKind::PreEdit, &edit_payload("agent-a", "src/lib.rs"))
        .await;

    assert!(decision.proceed);
    assert!(!decision.is_degraded());
    assert_eq!(decision.metadata["locked"], json!(["src/lib.rs"]));
    Ok(())
}

#[tokio::test]
async fn test_server_error_degrades_hook() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/hooks/pre_agent_spawn"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "error": "registry poisoned",
            "code": "INTERNAL"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let payload = spawn_payload("agent-a", "Refactor the scheduler");

    match client.try_process_hook(HookKind::PreAgentSpawn, &payload).await {
        Err(ClientError::Status { status, code, message }) => {
            assert_eq!(status, 500);
            assert_eq!(code, "INTERNAL");
            assert_eq!(message, "registry poisoned");
        }
        other => panic!("expected status error, got {:?}", other),
    }

    let decision = client.process_hook(HookKind::PreAgentSpawn, &payload).await;
    assert!(decision.proceed);
    assert!(decision.is_degraded());
    Ok(())
}

#[tokio::test]
async fn test_slow_daemon_times_out_to_proceed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/hooks/pre_command"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "proceed": false, "hook": "pre_command" }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let decision = client_for(&server)
        .process_hook(HookKind::PreCommand, &agent_payload("agent-a"))
        .await;

    assert!(decision.proceed);
    assert!(decision.is_degraded());
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).health().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    assert!(!err.is_unreachable());
    Ok(())
}

#[tokio::test]
async fn test_plan_falls_back_when_daemon_errors() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/plan"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "status": "error",
            "error": "planner crashed",
            "code": "INTERNAL"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = fallback::plan(&client, &test_config(), "Fix typo in README", None).await?;

    assert_eq!(outcome.consensus.tier, ComplexityTier::Simple);
    assert!(!outcome.triage_from_cache);
    Ok(())
}

#[tokio::test]
async fn test_triage_falls_back_on_undecodable_reply() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/triage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let consensus = fallback::triage(&client, &test_config(), "Fix typo in README").await?;

    assert_eq!(consensus.tier, ComplexityTier::Simple);
    assert_eq!(consensus.votes.len(), 3);
    Ok(())
}
