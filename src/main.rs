use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conductor::config::Config;
use conductor::daemon::{fallback, lifecycle, DaemonClient, DaemonStatus};
use conductor::hooks::{HookDecision, HookKind, HookPayload};
use conductor::planning::PlanPattern;
use conductor::workspace::WorkspaceContext;

#[derive(Parser)]
#[command(name = "conductor")]
#[command(
    about = "Coordination daemon and task planner for concurrent coding agents",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the coordination daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
    /// Handle an agent lifecycle hook (payload on stdin, decision on stdout)
    Hook {
        /// pre_command, pre_edit, post_edit, pre_agent_spawn or post_agent_spawn
        kind: String,
    },
    /// Build an execution plan for a task
    Plan {
        task: String,
        /// Force a pattern: direct, fanout, tournament or hierarchical
        #[arg(long)]
        pattern: Option<PlanPattern>,
    },
    /// Assess task complexity
    Triage { task: String },
    /// Write a workspace context file giving this directory an agent identity
    Init {
        /// Path to initialize (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Agent identity (default: generated)
        #[arg(long)]
        agent_id: Option<String>,
    },
    /// Configure conductor
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Set daemon port
        #[arg(long)]
        port: Option<u16>,
        /// Set Redis URL for the plan cache
        #[arg(long)]
        redis_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon (if not already running)
    #[command(disable_help_flag = true)]
    Start {
        /// Run in the current process instead of detaching
        #[arg(short, long)]
        foreground: bool,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short, long)]
        host: Option<String>,
        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },
    /// Stop the daemon gracefully
    Stop,
    /// Check daemon status
    Status,
    /// Stop then start the daemon
    #[command(disable_help_flag = true)]
    Restart {
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(short, long)]
        host: Option<String>,
        #[arg(long, action = clap::ArgAction::Help)]
        help: Option<bool>,
    },
    /// Show daemon logs
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        tail: usize,
        /// Keep printing new output
        #[arg(short, long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries hook decisions and plans
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conductor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon { action } => {
            let code = handle_daemon(action).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Hook { kind } => {
            let code = run_hook(&kind).await;
            std::process::exit(code);
        }
        Commands::Plan { task, pattern } => {
            run_plan(&task, pattern).await?;
        }
        Commands::Triage { task } => {
            run_triage(&task).await?;
        }
        Commands::Init { path, agent_id } => {
            init_workspace(path, agent_id)?;
        }
        Commands::Config { show, port, redis_url } => {
            handle_config(show, port, redis_url)?;
        }
    }

    Ok(())
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default configuration: {}", e);
        Config::default()
    })
}

fn apply_overrides(config: &mut Config, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.daemon.host = host;
    }
    if let Some(port) = port {
        config.daemon.port = port;
    }
}

/// Returns the process exit code
async fn handle_daemon(action: DaemonAction) -> Result<i32> {
    let mut config = load_config();

    match action {
        DaemonAction::Start { foreground, port, host, .. } => {
            apply_overrides(&mut config, host, port);
            if foreground {
                lifecycle::run_foreground(config).await?;
            } else {
                let pid = lifecycle::start(&config).await?;
                println!("✓ Daemon running at {} (PID: {})", config.daemon.base_url(), pid);
            }
            Ok(0)
        }
        DaemonAction::Stop => {
            if lifecycle::stop(&config).await? {
                println!("✓ Daemon stopped");
            } else {
                println!("Daemon is not running");
            }
            Ok(0)
        }
        DaemonAction::Status => match lifecycle::status(&config).await? {
            DaemonStatus::Running { pid, uptime_secs } => {
                println!("✓ Daemon running (PID: {}, uptime: {}s)", pid, uptime_secs);
                println!("  {}", config.daemon.base_url());
                Ok(0)
            }
            DaemonStatus::Unhealthy { pid, error } => {
                println!("✗ Daemon process {} exists but is not responding: {}", pid, error);
                Ok(1)
            }
            DaemonStatus::Stale { pid } => {
                println!("Daemon is not running (removed stale PID file for {})", pid);
                Ok(1)
            }
            DaemonStatus::Stopped => {
                println!("Daemon is not running");
                Ok(1)
            }
        },
        DaemonAction::Restart { port, host, .. } => {
            lifecycle::stop(&config).await?;
            apply_overrides(&mut config, host, port);
            let pid = lifecycle::start(&config).await?;
            println!("✓ Daemon restarted (PID: {})", pid);
            Ok(0)
        }
        DaemonAction::Logs { tail, follow } => {
            lifecycle::logs(&config, tail, follow).await?;
            Ok(0)
        }
    }
}

/// Hook entry point. Never fails: any problem prints a proceed decision
/// and exits zero.
async fn run_hook(kind: &str) -> i32 {
    let kind = match kind.parse::<HookKind>() {
        Ok(kind) => kind,
        Err(e) => {
            tracing::warn!("{}", e);
            println!(
                "{}",
                serde_json::json!({ "proceed": true, "status": "error", "error": e })
            );
            return 0;
        }
    };

    let decision = match decide_hook(kind).await {
        Ok(decision) => decision,
        Err(e) => HookDecision::degraded(kind, e.to_string()),
    };

    match serde_json::to_string(&decision) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{{\"proceed\":true}}"),
    }
    decision.exit_code()
}

async fn decide_hook(kind: HookKind) -> Result<HookDecision> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let mut payload: HookPayload = if input.trim().is_empty() {
        HookPayload::default()
    } else {
        serde_json::from_str(&input)?
    };

    if payload.agent_id.is_none() {
        let cwd = std::env::current_dir()?;
        if let Some(ctx) = WorkspaceContext::discover(&cwd) {
            payload.agent_id = Some(ctx.agent_id);
        }
    }

    let config = load_config();
    let client = DaemonClient::from_config(&config.daemon);
    Ok(client.process_hook(kind, &payload).await)
}

async fn run_plan(task: &str, pattern: Option<PlanPattern>) -> Result<()> {
    let config = load_config();
    let client = DaemonClient::from_config(&config.daemon);
    let outcome = fallback::plan(&client, &config, task, pattern).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn run_triage(task: &str) -> Result<()> {
    let config = load_config();
    let client = DaemonClient::from_config(&config.daemon);
    let consensus = fallback::triage(&client, &config, task).await?;

    println!("{}", serde_json::to_string_pretty(&consensus)?);
    Ok(())
}

fn init_workspace(path: PathBuf, agent_id: Option<String>) -> Result<()> {
    let context = match agent_id {
        Some(id) => {
            let generated = WorkspaceContext::generate();
            WorkspaceContext::new(id, generated.coordination_id)
        }
        None => WorkspaceContext::generate(),
    };
    let written = context.write(&path)?;

    println!("✓ Initialized agent workspace at: {}", path.display());
    println!("  Agent: {}", context.agent_id);
    println!("  Context: {}", written.display());
    Ok(())
}

fn handle_config(show: bool, port: Option<u16>, redis_url: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut changed = false;

    if let Some(port) = port {
        config.daemon.port = port;
        changed = true;
        println!("Daemon port updated");
    }

    if let Some(url) = redis_url {
        config.cache.redis_url = Some(url);
        changed = true;
        println!("Redis URL updated");
    }

    if changed {
        config.save()?;
        println!("Configuration saved to: {:?}", Config::config_path()?);
    } else {
        println!("No changes made. Use --show to view current configuration.");
    }

    Ok(())
}
