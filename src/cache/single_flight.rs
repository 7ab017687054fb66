//! Fingerprinting and single-flight result caching

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};

use super::key::{CacheCategory, CacheKey, KeySpace};
use super::store::{CacheError, CacheStore};

/// Deterministic SHA-256 fingerprint of a request.
///
/// The request is first converted to a JSON value, whose object keys are
/// ordered, so field order in the source type never changes the hash.
/// Callers are responsible for leaving timestamps out of the request.
pub fn fingerprint<T: Serialize>(request: &T) -> Result<String, CacheError> {
    let canonical = serde_json::to_value(request)?;
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// A result together with where it came from
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    /// True when this caller did not run the computation itself
    pub from_cache: bool,
}

#[derive(Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    store_errors: AtomicU64,
    requests: AtomicU64,
    total_latency_us: AtomicU64,
}

impl CacheMetrics {
    fn record(&self, counter: &AtomicU64, started: Instant) {
        counter.fetch_add(1, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us
            .fetch_add(started.elapsed().as_micros() as u64, Ordering::Relaxed);
    }
}

/// Point-in-time view of cache effectiveness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetricsSnapshot {
    pub backend: String,
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub store_errors: u64,
    pub evictions: u64,
    /// Fraction of requests served without running a computation (0-1)
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub avg_latency_ms: f64,
}

type Slot = Arc<OnceCell<serde_json::Value>>;

/// Result cache that runs at most one computation per key at a time
pub struct FingerprintCache {
    store: Arc<dyn CacheStore>,
    keys: KeySpace,
    in_flight: Mutex<HashMap<String, Slot>>,
    metrics: CacheMetrics,
}

impl FingerprintCache {
    pub fn new(store: Arc<dyn CacheStore>, keys: KeySpace) -> Self {
        Self {
            store,
            keys,
            in_flight: Mutex::new(HashMap::new()),
            metrics: CacheMetrics::default(),
        }
    }

    pub fn key(&self, category: CacheCategory, fingerprint: &str) -> CacheKey {
        self.keys.key(category, fingerprint)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Return the cached value for `key` or compute it.
    ///
    /// Concurrent callers with the same key share a single run of
    /// `compute`; the first caller computes and every other caller waits
    /// on the same slot. Store failures are logged and treated as misses.
    /// A failed computation is not cached and is returned only to the
    /// caller whose closure failed.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> anyhow::Result<Cached<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let started = Instant::now();

        if let Some(value) = self.lookup::<T>(key).await {
            self.metrics.record(&self.metrics.hits, started);
            return Ok(Cached {
                value,
                from_cache: true,
            });
        }

        let slot_key = key.to_string();
        let slot = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(slot_key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let computed_here = AtomicBool::new(false);
        let result = slot
            .get_or_try_init(|| async {
                // The previous slot owner may have stored between our lookup and now
                if let Some(value) = self.lookup::<serde_json::Value>(key).await {
                    return Ok(value);
                }
                computed_here.store(true, Ordering::SeqCst);
                let value = compute().await?;
                let json = serde_json::to_value(&value)?;
                self.persist(key, json.clone(), ttl).await;
                Ok::<_, anyhow::Error>(json)
            })
            .await
            .cloned();

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight
                .get(&slot_key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                in_flight.remove(&slot_key);
            }
        }

        let json = result?;
        let from_cache = !computed_here.load(Ordering::SeqCst);
        if from_cache {
            self.metrics.record(&self.metrics.coalesced, started);
        } else {
            self.metrics.record(&self.metrics.misses, started);
        }

        Ok(Cached {
            value: serde_json::from_value(json)?,
            from_cache,
        })
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(entry)) => match serde_json::from_value(entry.value) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.metrics.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache lookup failed for {}: {}. Computing directly.", key, e);
                None
            }
        }
    }

    async fn persist(&self, key: &CacheKey, value: serde_json::Value, ttl: Duration) {
        if let Err(e) = self.store.set(key, value, ttl).await {
            self.metrics.store_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Cache write failed for {}: {}", key, e);
        }
    }

    /// Recompute rates from the running counters
    pub async fn metrics(&self) -> CacheMetricsSnapshot {
        let store_stats = self.store.stats().await;
        let hits = self.metrics.hits.load(Ordering::Relaxed);
        let misses = self.metrics.misses.load(Ordering::Relaxed);
        let coalesced = self.metrics.coalesced.load(Ordering::Relaxed);
        let requests = self.metrics.requests.load(Ordering::Relaxed);
        let latency_us = self.metrics.total_latency_us.load(Ordering::Relaxed);

        let (hit_rate, miss_rate, avg_latency_ms) = if requests == 0 {
            (0.0, 0.0, 0.0)
        } else {
            let total = requests as f64;
            (
                (hits + coalesced) as f64 / total,
                misses as f64 / total,
                latency_us as f64 / total / 1000.0,
            )
        };

        CacheMetricsSnapshot {
            backend: store_stats.backend,
            hits,
            misses,
            coalesced,
            store_errors: self.metrics.store_errors.load(Ordering::Relaxed),
            evictions: store_stats.evictions,
            hit_rate,
            miss_rate,
            avg_latency_ms,
        }
    }
}
