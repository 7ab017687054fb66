//! Daemon state shared by all request handlers

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Notify};

use super::lifecycle::LifecycleState;
use crate::cache::{store_from_config, CacheStore, FingerprintCache, KeySpace};
use crate::config::Config;
use crate::coordination::CoordinationRegistry;
use crate::hooks::{AuditLog, DangerousCommandDetector, HookRouter};
use crate::planning::PlanningEngine;

pub struct DaemonState {
    pub config: Config,
    pub registry: Arc<CoordinationRegistry>,
    pub hooks: HookRouter,
    pub planner: PlanningEngine,
    pub cache: Arc<FingerprintCache>,
    started_at: Instant,
    requests: AtomicU64,
    errors: AtomicU64,
    lifecycle: watch::Sender<LifecycleState>,
    shutdown: Notify,
}

impl DaemonState {
    /// Build state from configuration.
    ///
    /// Starts the audit writer when auditing is enabled, so this must run
    /// inside a Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let audit = if config.coordination.audit_enabled {
            AuditLog::spawn(config.coordination.audit_path()?)
        } else {
            AuditLog::disabled()
        };
        let store = store_from_config(&config.cache);
        Ok(Self::with_parts(config, store, audit))
    }

    /// Build state over an explicit cache store and audit log
    pub fn with_parts(config: Config, store: Arc<dyn CacheStore>, audit: AuditLog) -> Self {
        let keys = KeySpace::new(config.cache.key_prefix.clone(), config.cache.key_version.clone());
        let cache = Arc::new(FingerprintCache::new(store, keys));
        let registry = Arc::new(CoordinationRegistry::from_config(&config.coordination));
        let detector = DangerousCommandDetector::new(&config.coordination.dangerous_patterns);
        let hooks = HookRouter::new(registry.clone(), detector, audit);
        let planner = PlanningEngine::from_config(cache.clone(), &config);

        Self {
            config,
            registry,
            hooks,
            planner,
            cache,
            started_at: Instant::now(),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            lifecycle: watch::channel(LifecycleState::Starting).0,
            shutdown: Notify::new(),
        }
    }

    pub fn record_request(&self, failed: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Starting until the server loop runs, Stopping once shutdown begins
    pub fn lifecycle(&self) -> LifecycleState {
        *self.lifecycle.borrow()
    }

    pub fn set_lifecycle(&self, next: LifecycleState) {
        let previous = self.lifecycle.send_replace(next);
        if previous != next {
            tracing::debug!("Daemon lifecycle: {:?} -> {:?}", previous, next);
        }
    }

    /// Ask the server to stop accepting requests and exit
    pub fn request_shutdown(&self) {
        self.set_lifecycle(LifecycleState::Stopping);
        // notify_one keeps a permit if the server isn't waiting yet
        self.shutdown.notify_one();
    }

    pub async fn shutdown_requested(&self) {
        self.shutdown.notified().await;
    }
}
