//! Single-flight and degradation behaviour of the fingerprint cache

use super::common::*;
use anyhow::Result;
use conductor::cache::{
    fingerprint, CacheCategory, CacheStore, FingerprintCache, KeySpace, RedisCache,
};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(60);

#[tokio::test]
async fn test_concurrent_callers_share_one_computation() -> Result<()> {
    let cache = memory_cache();
    let key = cache.key(CacheCategory::Planning, &fingerprint(&("task", "complex"))?);
    let computations = AtomicUsize::new(0);

    let callers = (0..10).map(|_| {
        cache.get_or_compute(&key, TTL, || async {
            computations.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, anyhow::Error>(vec!["discovery".to_string(), "design".to_string()])
        })
    });
    let results = join_all(callers).await;

    assert_eq!(computations.load(Ordering::SeqCst), 1);
    let fresh = results
        .iter()
        .filter(|r| matches!(r, Ok(cached) if !cached.from_cache))
        .count();
    assert_eq!(fresh, 1);
    for result in results {
        assert_eq!(result?.value.len(), 2);
    }

    let metrics = cache.metrics().await;
    assert_eq!(metrics.misses, 1);
    assert!(metrics.coalesced + metrics.hits >= 9);
    Ok(())
}

#[tokio::test]
async fn test_failed_computation_is_not_cached() -> Result<()> {
    let cache = memory_cache();
    let key = cache.key(CacheCategory::Triage, "abc123");

    let failed = cache
        .get_or_compute::<String, _, _>(&key, TTL, || async { anyhow::bail!("assessor offline") })
        .await;
    assert!(failed.is_err());

    let retried = cache
        .get_or_compute(&key, TTL, || async { Ok("medium".to_string()) })
        .await?;
    assert!(!retried.from_cache);
    assert_eq!(retried.value, "medium");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_redis_degrades_to_direct_computation() -> Result<()> {
    let store: Arc<dyn CacheStore> =
        Arc::new(RedisCache::new("redis://127.0.0.1:1/", Duration::from_millis(200))?);
    let cache = FingerprintCache::new(store, KeySpace::default());
    let key = cache.key(CacheCategory::Composition, "deadbeef");

    for _ in 0..2 {
        let result = cache
            .get_or_compute(&key, TTL, || async { Ok(42u32) })
            .await?;
        assert_eq!(result.value, 42);
        assert!(!result.from_cache);
    }

    let metrics = cache.metrics().await;
    assert_eq!(metrics.backend, "redis");
    assert!(metrics.store_errors >= 1);
    Ok(())
}
