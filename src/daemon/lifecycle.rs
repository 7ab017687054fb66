//! Daemon process lifecycle
//!
//! Start, stop, status and log access for the background daemon. The
//! daemon is a re-exec of the current binary in foreground mode, detached
//! into its own process group, with a PID file under the data directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::{sleep, Instant};

use super::client::DaemonClient;
use super::state::DaemonState;
use crate::config::Config;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    Running { pid: u32, uptime_secs: u64 },
    /// The process exists but does not answer health checks
    Unhealthy { pid: u32, error: String },
    /// A PID file named a process that no longer exists; the file was removed
    Stale { pid: u32 },
    Stopped,
}

impl DaemonStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, DaemonStatus::Running { .. })
    }

    pub fn state(&self) -> LifecycleState {
        match self {
            DaemonStatus::Running { .. } | DaemonStatus::Unhealthy { .. } => {
                LifecycleState::Running
            }
            DaemonStatus::Stale { .. } | DaemonStatus::Stopped => LifecycleState::Stopped,
        }
    }
}

pub fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, pid.to_string())
        .with_context(|| format!("Failed to write PID file {}", path.display()))
}

/// PID recorded in `path`, if the file exists and parses
pub fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

pub fn remove_pid_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove PID file {}: {}", path.display(), e);
        }
    }
}

/// Removes the PID file when the foreground daemon exits
pub struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    pub fn create(path: PathBuf) -> Result<Self> {
        write_pid_file(&path, std::process::id())?;
        Ok(Self { path })
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        // Only remove the file if it's still ours
        if read_pid(&self.path) == Some(std::process::id()) {
            remove_pid_file(&self.path);
        }
    }
}

#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // Exists but owned by someone else
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn process_exists(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).context("PID out of range")?;
    kill(Pid::from_raw(raw), Signal::SIGTERM).context("Failed to send SIGTERM")?;
    Ok(())
}

#[cfg(not(unix))]
fn terminate(pid: u32) -> Result<()> {
    anyhow::bail!("Cannot signal process {} on this platform", pid)
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Run the daemon in the current process until shut down
pub async fn run_foreground(config: Config) -> Result<()> {
    let client = DaemonClient::from_config(&config.daemon);
    if client.is_running().await {
        tracing::info!("Daemon already running at {}", client.base_url());
        return Ok(());
    }

    let addr = format!("{}:{}", config.daemon.host, config.daemon.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let _pid_guard = PidFileGuard::create(config.daemon.pid_path()?)?;
    let state = Arc::new(DaemonState::new(config)?);

    tracing::info!("Daemon listening on {} (pid {})", addr, std::process::id());
    super::serve(listener, state, shutdown_signal()).await?;
    tracing::info!("Daemon stopped");
    Ok(())
}

async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Start the daemon in the background. Returns the PID of the running
/// daemon; idempotent if one is already up.
pub async fn start(config: &Config) -> Result<u32> {
    let client = DaemonClient::from_config(&config.daemon);
    if let Some(pid) = client.live_pid().await {
        tracing::info!("Daemon already running (pid {})", pid);
        return Ok(pid);
    }

    let log_path = config.daemon.log_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    let err_file = log_file.try_clone()?;

    let exe = std::env::current_exe().context("Failed to get current executable path")?;
    let mut cmd = Command::new(exe);
    cmd.args(["daemon", "start", "--foreground"])
        .arg("--host")
        .arg(&config.daemon.host)
        .arg("--port")
        .arg(config.daemon.port.to_string())
        .stdin(Stdio::null())
        .stdout(log_file)
        .stderr(err_file);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().context("Failed to spawn daemon process")?;
    tracing::info!("Spawned daemon (pid {})", child.id());

    let wait = Duration::from_millis(config.daemon.startup_wait_ms);
    if !wait_until(wait, || client.is_running()).await {
        anyhow::bail!(
            "Daemon did not become ready within {}ms, see {}",
            config.daemon.startup_wait_ms,
            log_path.display()
        );
    }
    Ok(client.live_pid().await.unwrap_or_else(|| child.id()))
}

/// Stop the daemon. Tries the shutdown endpoint first and falls back to
/// SIGTERM. Returns false if nothing was running.
pub async fn stop(config: &Config) -> Result<bool> {
    let client = DaemonClient::from_config(&config.daemon);
    let pid_path = config.daemon.pid_path()?;
    let pid = read_pid(&pid_path);

    let mut was_running = false;
    if client.is_running().await {
        was_running = true;
        if let Err(e) = client.shutdown().await {
            tracing::warn!("Graceful shutdown request failed: {}", e);
        }
        let probe = &client;
        if wait_until(STOP_WAIT, move || async move { !probe.is_running().await }).await {
            remove_pid_file(&pid_path);
            return Ok(true);
        }
    }

    let signalled = match pid.filter(|p| process_exists(*p)) {
        Some(pid) => {
            was_running = true;
            signal_and_wait(pid).await
        }
        None => Ok(()),
    };

    // The file goes even when the process outlives SIGTERM
    remove_pid_file(&pid_path);
    signalled.map(|()| was_running)
}

async fn signal_and_wait(pid: u32) -> Result<()> {
    tracing::info!("Sending SIGTERM to process {}", pid);
    terminate(pid)?;
    if !wait_until(STOP_WAIT, || async move { !process_exists(pid) }).await {
        anyhow::bail!("Daemon (pid {}) did not stop within {:?}", pid, STOP_WAIT);
    }
    Ok(())
}

/// Health check first, PID file second. A PID file naming a dead process
/// is removed and reported as stale.
pub async fn status(config: &Config) -> Result<DaemonStatus> {
    let client = DaemonClient::from_config(&config.daemon);
    let pid_path = config.daemon.pid_path()?;

    match client.health().await {
        Ok(health) => Ok(DaemonStatus::Running {
            pid: health.pid,
            uptime_secs: health.uptime_secs,
        }),
        Err(e) => match read_pid(&pid_path) {
            Some(pid) if process_exists(pid) => Ok(DaemonStatus::Unhealthy {
                pid,
                error: e.to_string(),
            }),
            Some(pid) => {
                remove_pid_file(&pid_path);
                Ok(DaemonStatus::Stale { pid })
            }
            None => Ok(DaemonStatus::Stopped),
        },
    }
}

/// Last `n` lines of `content`
pub fn tail_lines(content: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}

/// Print the last `tail` log lines, then keep printing appended output if
/// `follow` is set.
pub async fn logs(config: &Config, tail: usize, follow: bool) -> Result<()> {
    let path = config.daemon.log_path()?;
    if !path.exists() {
        println!("No daemon log at {}", path.display());
        return Ok(());
    }

    let content = fs::read_to_string(&path)?;
    for line in tail_lines(&content, tail) {
        println!("{}", line);
    }
    if !follow {
        return Ok(());
    }

    let mut offset = content.len() as u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = sleep(Duration::from_millis(500)) => {}
        }

        let mut file = fs::File::open(&path)?;
        let len = file.metadata()?.len();
        if len < offset {
            // Truncated or rotated
            offset = 0;
        }
        if len > offset {
            file.seek(SeekFrom::Start(offset))?;
            let mut appended = String::new();
            file.read_to_string(&mut appended)?;
            print!("{}", appended);
            offset = len;
        }
    }
}
