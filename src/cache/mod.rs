//! Fingerprint cache for planning and triage results
//!
//! Results are stored in an external key-value store (Redis) when one is
//! configured and in process memory otherwise. The store is strictly an
//! optimization: every failure degrades to a miss and the caller computes
//! directly. [`FingerprintCache`] adds single-flight semantics on top so
//! concurrent identical requests share one computation.

mod key;
mod redis_store;
mod single_flight;
mod store;

pub use key::{CacheCategory, CacheKey, KeySpace};
pub use redis_store::RedisCache;
pub use single_flight::{fingerprint, Cached, CacheMetricsSnapshot, FingerprintCache};
pub use store::{CacheEntry, CacheError, CacheStore, MemoryCache, StoreStats};

use std::sync::Arc;

use crate::config::CacheConfig;

/// Build the configured store: Redis when a URL is set, memory otherwise.
///
/// An invalid Redis URL is logged and replaced by the memory store.
pub fn store_from_config(config: &CacheConfig) -> Arc<dyn CacheStore> {
    if let Some(url) = &config.redis_url {
        match RedisCache::new(url, config.operation_timeout()) {
            Ok(store) => {
                tracing::info!("Using Redis cache store at {}", url);
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("Invalid Redis URL ({}). Falling back to memory cache.", e);
            }
        }
    }
    Arc::new(MemoryCache::new(config.memory_max_entries))
}
