use anyhow::Result;
use conductor::cache::{CacheStore, FingerprintCache, KeySpace, MemoryCache};
use conductor::config::Config;
use conductor::daemon::{self, DaemonClient, DaemonState};
use conductor::hooks::{HookPayload, ToolInput};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Configuration that never touches Redis or the audit log
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.cache.redis_url = None;
    config.coordination.audit_enabled = false;
    config
}

pub fn memory_cache() -> Arc<FingerprintCache> {
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new(256));
    Arc::new(FingerprintCache::new(store, KeySpace::new("conductor-test", "v1")))
}

/// A daemon served from this process on an ephemeral port
pub struct TestDaemon {
    pub client: DaemonClient,
    pub state: Arc<DaemonState>,
    handle: JoinHandle<Result<()>>,
}

impl TestDaemon {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let store: Arc<dyn CacheStore> = Arc::new(MemoryCache::new(256));
        let state = Arc::new(DaemonState::with_parts(
            test_config(),
            store,
            conductor::hooks::AuditLog::disabled(),
        ));
        let handle = tokio::spawn(daemon::serve(
            listener,
            state.clone(),
            std::future::pending::<()>(),
        ));

        let client = DaemonClient::new(format!("http://{}", addr), Duration::from_secs(5));
        Ok(Self {
            client,
            state,
            handle,
        })
    }

    /// Wait for the server task to exit after a shutdown request
    pub async fn join(self) -> Result<()> {
        tokio::time::timeout(Duration::from_secs(5), self.handle).await???;
        Ok(())
    }
}

pub fn agent_payload(agent_id: &str) -> HookPayload {
    HookPayload {
        agent_id: Some(agent_id.to_string()),
        ..Default::default()
    }
}

pub fn edit_payload(agent_id: &str, file: &str) -> HookPayload {
    HookPayload {
        agent_id: Some(agent_id.to_string()),
        tool_name: Some("Edit".to_string()),
        tool_input: ToolInput {
            file_path: Some(file.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn spawn_payload(agent_id: &str, prompt: &str) -> HookPayload {
    HookPayload {
        agent_id: Some(agent_id.to_string()),
        tool_name: Some("Task".to_string()),
        tool_input: ToolInput {
            prompt: Some(prompt.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}
