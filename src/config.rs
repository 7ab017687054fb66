use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheCategory;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub coordination: CoordinationConfig,
    #[serde(default)]
    pub planning: PlanningConfig,
}

/// Network and process settings for the coordination daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Client-side timeout for every daemon request (default: 1500ms)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long `start` waits for a backgrounded daemon to answer (default: 5000ms)
    #[serde(default = "default_startup_wait_ms")]
    pub startup_wait_ms: u64,

    /// PID file location (default: <data_dir>/conductor/daemon.pid)
    #[serde(default)]
    pub pid_file: Option<PathBuf>,

    /// Log file location (default: <data_dir>/conductor/daemon.log)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_request_timeout_ms() -> u64 {
    1500
}

fn default_startup_wait_ms() -> u64 {
    5000
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            startup_wait_ms: default_startup_wait_ms(),
            pid_file: None,
            log_file: None,
        }
    }
}

impl DaemonConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn pid_path(&self) -> Result<PathBuf> {
        match &self.pid_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::data_dir()?.join("daemon.pid")),
        }
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::data_dir()?.join("daemon.log")),
        }
    }
}

/// External cache store settings and per-category TTLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL; when absent an in-process memory cache is used
    #[serde(default = "default_redis_url")]
    pub redis_url: Option<String>,

    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_key_version")]
    pub key_version: String,

    /// Upper bound on any single store round trip (default: 250ms)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,

    #[serde(default = "default_planning_ttl")]
    pub planning_ttl_secs: u64,

    #[serde(default = "default_triage_ttl")]
    pub triage_ttl_secs: u64,

    #[serde(default = "default_composition_ttl")]
    pub composition_ttl_secs: u64,

    #[serde(default = "default_template_ttl")]
    pub template_ttl_secs: u64,
}

fn default_redis_url() -> Option<String> {
    std::env::var("CONDUCTOR_REDIS_URL").ok()
}

fn default_key_prefix() -> String {
    "conductor".to_string()
}

fn default_key_version() -> String {
    "v1".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    250
}

fn default_memory_max_entries() -> usize {
    512
}

fn default_planning_ttl() -> u64 {
    60 * 60
}

fn default_triage_ttl() -> u64 {
    30 * 60
}

fn default_composition_ttl() -> u64 {
    60 * 60
}

fn default_template_ttl() -> u64 {
    24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            key_prefix: default_key_prefix(),
            key_version: default_key_version(),
            operation_timeout_ms: default_operation_timeout_ms(),
            memory_max_entries: default_memory_max_entries(),
            planning_ttl_secs: default_planning_ttl(),
            triage_ttl_secs: default_triage_ttl(),
            composition_ttl_secs: default_composition_ttl(),
            template_ttl_secs: default_template_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_for(&self, category: CacheCategory) -> Duration {
        let secs = match category {
            CacheCategory::Planning => self.planning_ttl_secs,
            CacheCategory::Triage => self.triage_ttl_secs,
            CacheCategory::Composition => self.composition_ttl_secs,
            CacheCategory::SessionTemplate => self.template_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Registry and hook policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationConfig {
    /// Token-overlap ratio at or above which two tasks count as duplicates
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Maximum characters kept from a shared result
    #[serde(default = "default_artifact_excerpt_chars")]
    pub artifact_excerpt_chars: usize,

    /// Substrings that flag a command as dangerous (metadata only)
    #[serde(default = "default_dangerous_patterns")]
    pub dangerous_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub audit_enabled: bool,

    /// Audit log location (default: <data_dir>/conductor/audit.jsonl)
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
}

fn default_similarity_threshold() -> f64 {
    0.8
}

fn default_artifact_excerpt_chars() -> usize {
    2000
}

fn default_dangerous_patterns() -> Vec<String> {
    vec![
        "rm -rf /".to_string(),
        "rm -rf ~".to_string(),
        "rm -rf *".to_string(),
        ":(){ :|:& };:".to_string(), // Fork bomb
        "mkfs.".to_string(),
        "dd if=".to_string(),
        "> /dev/sd".to_string(),
        "chmod -r 777 /".to_string(),
        "git push --force".to_string(),
        "git reset --hard".to_string(),
        "drop table".to_string(),
        "drop database".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            artifact_excerpt_chars: default_artifact_excerpt_chars(),
            dangerous_patterns: default_dangerous_patterns(),
            audit_enabled: true,
            audit_log: None,
        }
    }
}

impl CoordinationConfig {
    pub fn audit_path(&self) -> Result<PathBuf> {
        match &self.audit_log {
            Some(path) => Ok(path.clone()),
            None => Ok(Config::data_dir()?.join("audit.jsonl")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Number of independent complexity assessments per triage
    #[serde(default = "default_triage_votes")]
    pub triage_votes: usize,

    /// Upper bound on agents in a single fanout phase
    #[serde(default = "default_max_parallel_agents")]
    pub max_parallel_agents: usize,

    /// Competing candidates generated by the tournament pattern
    #[serde(default = "default_tournament_candidates")]
    pub tournament_candidates: usize,
}

fn default_triage_votes() -> usize {
    3
}

fn default_max_parallel_agents() -> usize {
    5
}

fn default_tournament_candidates() -> usize {
    3
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            triage_votes: default_triage_votes(),
            max_parallel_agents: default_max_parallel_agents(),
            tournament_candidates: default_tournament_candidates(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;
        Ok(config_dir.join("conductor").join("config.toml"))
    }

    /// Directory holding the PID file, daemon log and audit log
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .context("Could not determine data directory")?;
        Ok(data_dir.join("conductor"))
    }
}
