use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use taskrow::{config::AppConfig, provider::Provider, rest, AppContext};

#[derive(Parser)]
#[command(
    name = "taskrow",
    about = "Task-management API server — OTP signup, session cookies, per-user task CRUD",
    version
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port
    #[arg(long, env = "TASKROW_PORT")]
    port: Option<u16>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKROW_BIND")]
    bind_address: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKROW_LOG")]
    log: Option<String>,

    /// Path to the TOML config file (default: taskrow.toml)
    #[arg(long, env = "TASKROW_CONFIG")]
    config_file: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the API server (default when no subcommand given).
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Provider credentials are required; a half-configured backend aborts
    // startup here rather than failing on the first request.
    let config = AppConfig::new(args.port, args.config_file, args.log, args.bind_address)?;
    setup_logging(&config.log, &config.log_format);

    let provider = Provider::new(&config).context("failed to construct provider client")?;
    let ctx = Arc::new(AppContext {
        config: Arc::new(config),
        provider: Arc::new(provider),
        started_at: std::time::Instant::now(),
    });

    match args.command {
        Some(Command::Serve) | None => rest::start_server(ctx).await,
    }
}

fn setup_logging(log_level: &str, log_format: &str) {
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
    }
}
