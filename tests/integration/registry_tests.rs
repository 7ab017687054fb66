//! Concurrency properties of the coordination registry

use conductor::coordination::CoordinationRegistry;
use std::path::Path;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lock_has_one_winner() {
    let registry = Arc::new(CoordinationRegistry::default());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let agent = format!("agent-{}", i);
                registry.register_or_get_agent(&agent, None, "").await;
                registry.acquire_file_lock(&agent, Path::new("src/main.rs")).await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.agents.len(), 16);
    assert_eq!(snapshot.lock_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cleanup_releases_everything() {
    let registry = Arc::new(CoordinationRegistry::default());
    for i in 0..8 {
        let agent = format!("agent-{}", i);
        for f in 0..4 {
            let path = format!("src/{}/{}.rs", agent, f);
            assert!(registry.acquire_file_lock(&agent, Path::new(&path)).await);
        }
    }
    assert_eq!(registry.snapshot().await.lock_count(), 32);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move { registry.cleanup_agent(&format!("agent-{}", i)).await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().map(|files| files.len()), Some(4));
    }

    assert_eq!(registry.active_agents().await, 0);
    assert_eq!(registry.snapshot().await.lock_count(), 0);
}

#[tokio::test]
async fn test_release_by_unknown_agent_is_noop() {
    let registry = CoordinationRegistry::default();
    assert!(!registry.release_file_lock("ghost", Path::new("src/lib.rs")).await);
    assert!(registry.cleanup_agent("ghost").await.is_none());
    assert_eq!(registry.active_agents().await, 0);
}

#[tokio::test]
async fn test_shared_excerpts_are_bounded() {
    let registry = CoordinationRegistry::new(0.8, 32);
    registry.share_result("agent-a", &"x".repeat(500)).await;

    let artifacts = registry.recent_artifacts(10, None).await;
    assert_eq!(artifacts.len(), 1);
    assert!(artifacts[0].excerpt.chars().count() <= 35);
}
