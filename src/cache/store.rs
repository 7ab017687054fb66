//! Cache storage backends for fingerprinted results

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

use super::key::CacheKey;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),
    #[error("cache command failed: {0}")]
    Command(String),
    #[error("cache entry is malformed: {0}")]
    Malformed(String),
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A stored result with its bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: serde_json::Value,
    pub ttl_secs: u64,
    pub cached_at: DateTime<Utc>,
    /// Number of reads served from this entry, including the current one
    pub hit_count: u64,
}

/// Backend-level statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub backend: String,
    /// Live entries, when the backend can count them cheaply
    pub entries: Option<usize>,
    pub evictions: u64,
}

/// Trait for cache storage backends
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a fresh entry; expired entries are reported as absent
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Store a value, overwriting any existing entry
    async fn set(
        &self,
        key: &CacheKey,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    /// Cheap round trip proving the backend is reachable
    async fn health(&self) -> Result<(), CacheError>;

    async fn stats(&self) -> StoreStats;
}

struct MemoryEntry {
    entry: CacheEntry,
    inserted: Instant,
    ttl: Duration,
    last_access: Instant,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.inserted.elapsed() > self.ttl
    }
}

/// In-memory cache with TTL expiry and LRU eviction
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
    max_entries: usize,
    evictions: AtomicU64,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            evictions: AtomicU64::new(0),
        }
    }

    /// Evict expired entries and enforce the LRU limit
    fn evict_if_needed(&self, entries: &mut HashMap<String, MemoryEntry>) {
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());

        while entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }

        let evicted = before.saturating_sub(entries.len()) as u64;
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(512)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let string_key = key.to_string();
        let mut entries = self.entries.write().await;

        let expired = match entries.get_mut(&string_key) {
            Some(e) if !e.is_expired() => {
                e.last_access = Instant::now();
                e.entry.hit_count += 1;
                return Ok(Some(e.entry.clone()));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(&string_key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let string_key = key.to_string();
        let mut entries = self.entries.write().await;

        // Overwrites don't need room
        if !entries.contains_key(&string_key) {
            self.evict_if_needed(&mut entries);
        }

        let now = Instant::now();
        entries.insert(
            string_key.clone(),
            MemoryEntry {
                entry: CacheEntry {
                    key: string_key,
                    value,
                    ttl_secs: ttl.as_secs(),
                    cached_at: Utc::now(),
                    hit_count: 0,
                },
                inserted: now,
                ttl,
                last_access: now,
            },
        );
        Ok(())
    }

    async fn health(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn stats(&self) -> StoreStats {
        let entries = self.entries.read().await;
        StoreStats {
            backend: "memory".to_string(),
            entries: Some(entries.iter().filter(|(_, e)| !e.is_expired()).count()),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> CacheKey {
        CacheKey::new("conductor", "planning", "v1", id)
    }

    #[tokio::test]
    async fn test_memory_cache_basic() {
        let cache = MemoryCache::new(10);

        assert!(cache.get(&key("a")).await.unwrap().is_none());

        cache
            .set(&key("a"), json!({"tier": "simple"}), Duration::from_secs(60))
            .await
            .unwrap();

        let entry = cache.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(entry.value["tier"], "simple");
        assert_eq!(entry.hit_count, 1);
        assert_eq!(entry.key, "conductor:planning:v1:a");

        let entry = cache.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(entry.hit_count, 2);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = MemoryCache::new(10);
        cache
            .set(&key("a"), json!(1), Duration::from_millis(10))
            .await
            .unwrap();

        assert!(cache.get(&key("a")).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cache.get(&key("a")).await.unwrap().is_none());
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_cache_lru_eviction() {
        let cache = MemoryCache::new(2);
        let ttl = Duration::from_secs(60);

        cache.set(&key("1"), json!(1), ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set(&key("2"), json!(2), ttl).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        // Touch key1 so key2 becomes least recently used
        cache.get(&key("1")).await.unwrap();
        cache.set(&key("3"), json!(3), ttl).await.unwrap();

        assert!(cache.get(&key("1")).await.unwrap().is_some());
        assert!(cache.get(&key("2")).await.unwrap().is_none());
        assert!(cache.get(&key("3")).await.unwrap().is_some());

        let stats = cache.stats().await;
        assert_eq!(stats.entries, Some(2));
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_resets_entry() {
        let cache = MemoryCache::new(1);
        let ttl = Duration::from_secs(60);

        cache.set(&key("a"), json!("old"), ttl).await.unwrap();
        cache.get(&key("a")).await.unwrap();
        cache.set(&key("a"), json!("new"), ttl).await.unwrap();

        let entry = cache.get(&key("a")).await.unwrap().unwrap();
        assert_eq!(entry.value, json!("new"));
        assert_eq!(entry.hit_count, 1);
        assert_eq!(cache.stats().await.evictions, 0);
    }
}
