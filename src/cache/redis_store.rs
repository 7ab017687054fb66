//! Redis-backed cache store
//!
//! Each entry is a hash (`value`, `cached_at`, `ttl_secs`, `hit_count`)
//! whose lifetime is governed by a Redis `EXPIRE`. Writes go through one
//! `MULTI` block and reads bump the hit counter server-side, so a hash
//! never exists without its TTL. Every round trip is bounded by the
//! configured operation timeout so an unreachable server degrades to a
//! fast miss rather than a stalled planner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::key::CacheKey;
use super::store::{CacheEntry, CacheError, CacheStore, StoreStats};

/// Count a hit and return the hash, without recreating an expired key
const GET_AND_COUNT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 0 then
    return {}
end
redis.call('HINCRBY', KEYS[1], 'hit_count', 1)
return redis.call('HGETALL', KEYS[1])
"#;

pub struct RedisCache {
    client: redis::Client,
    timeout: Duration,
}

impl RedisCache {
    /// Create a new Redis store
    ///
    /// # Errors
    ///
    /// Returns error if the Redis URL is invalid. No connection is made.
    pub fn new(redis_url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        match tokio::time::timeout(self.timeout, self.client.get_multiplexed_async_connection())
            .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(CacheError::Connection(format!(
                "Redis connection failed: {}",
                e
            ))),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Command(format!("Redis {} failed: {}", op, e))),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

/// Rebuild an entry from the fields of its hash
fn entry_from_fields(
    key: &str,
    fields: &HashMap<String, String>,
) -> Result<CacheEntry, CacheError> {
    let raw_value = fields
        .get("value")
        .ok_or_else(|| CacheError::Malformed(format!("{} has no value field", key)))?;
    let value = serde_json::from_str(raw_value)?;

    let cached_at = fields
        .get("cached_at")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CacheError::Malformed(format!("{} has no valid cached_at", key)))?;

    let ttl_secs = fields
        .get("ttl_secs")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let hit_count = fields
        .get("hit_count")
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
        .max(0) as u64;

    Ok(CacheEntry {
        key: key.to_string(),
        value,
        ttl_secs,
        cached_at,
        hit_count,
    })
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let mut conn = self.get_connection().await?;
        let key = key.to_string();

        let fields: HashMap<String, String> = self
            .bounded(
                "EVAL",
                redis::cmd("EVAL")
                    .arg(GET_AND_COUNT)
                    .arg(1)
                    .arg(&key)
                    .query_async(&mut conn),
            )
            .await?;

        if fields.is_empty() {
            return Ok(None);
        }

        let entry = entry_from_fields(&key, &fields)?;
        debug!(key = %key, hits = entry.hit_count, "Cache entry loaded from Redis");
        Ok(Some(entry))
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let key = key.to_string();
        let json = serde_json::to_string(&value)?;
        let ttl_secs = ttl.as_secs().max(1);

        // DEL first so an overwrite starts with a fresh hit counter
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("DEL")
            .arg(&key)
            .ignore()
            .cmd("HSET")
            .arg(&key)
            .arg("value")
            .arg(&json)
            .arg("cached_at")
            .arg(Utc::now().to_rfc3339())
            .arg("ttl_secs")
            .arg(ttl_secs)
            .arg("hit_count")
            .arg(0)
            .ignore()
            .cmd("EXPIRE")
            .arg(&key)
            .arg(ttl_secs)
            .ignore();

        self.bounded("MULTI", pipe.query_async::<()>(&mut conn)).await?;

        debug!(key = %key, ttl = %ttl_secs, "Cache entry saved to Redis");
        Ok(())
    }

    async fn health(&self) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let pong: String = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Command(format!("unexpected PING reply: {}", pong)))
        }
    }

    async fn stats(&self) -> StoreStats {
        // Redis TTL handles expiration; evictions aren't observable from here
        StoreStats {
            backend: "redis".to_string(),
            entries: None,
            evictions: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RedisCache::new("not a url", Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_entry_from_fields() {
        let mut fields = HashMap::new();
        fields.insert("value".to_string(), r#"{"tier":"complex"}"#.to_string());
        fields.insert("cached_at".to_string(), "2024-01-01T00:00:00+00:00".to_string());
        fields.insert("ttl_secs".to_string(), "60".to_string());
        fields.insert("hit_count".to_string(), "3".to_string());

        let entry = entry_from_fields("k", &fields).unwrap();
        assert_eq!(entry.value["tier"], "complex");
        assert_eq!(entry.ttl_secs, 60);
        assert_eq!(entry.hit_count, 3);
    }

    #[test]
    fn test_entry_without_value_is_malformed() {
        let fields = HashMap::new();
        assert!(matches!(
            entry_from_fields("k", &fields),
            Err(CacheError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_fast() {
        // Port 1 is never a Redis server
        let store = RedisCache::new("redis://127.0.0.1:1/", Duration::from_millis(200)).unwrap();
        let key = CacheKey::new("conductor", "triage", "v1", "x");
        assert!(store.get(&key).await.is_err());
        assert!(store.health().await.is_err());
    }

    /// Against a live server: `CONDUCTOR_TEST_REDIS_URL` or localhost
    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_entries_expire_and_misses_leave_nothing() {
        let url = std::env::var("CONDUCTOR_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string());
        let store = RedisCache::new(&url, Duration::from_secs(2)).unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let key = CacheKey::new("conductor-test", "triage", "v1", &id);

        // A miss must not create a counter-only hash
        assert!(store.get(&key).await.unwrap().is_none());
        let mut conn = store.get_connection().await.unwrap();
        let exists: bool = redis::cmd("EXISTS")
            .arg(key.to_string())
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(!exists);

        store
            .set(&key, serde_json::json!({"tier": "simple"}), Duration::from_secs(30))
            .await
            .unwrap();
        let ttl: i64 = redis::cmd("TTL")
            .arg(key.to_string())
            .query_async(&mut conn)
            .await
            .unwrap();
        assert!(ttl > 0 && ttl <= 30);

        let first = store.get(&key).await.unwrap().unwrap();
        let second = store.get(&key).await.unwrap().unwrap();
        assert_eq!(first.hit_count, 1);
        assert_eq!(second.hit_count, 2);
        assert_eq!(second.value["tier"], "simple");

        let _: () = redis::cmd("DEL")
            .arg(key.to_string())
            .query_async(&mut conn)
            .await
            .unwrap();
    }
}
