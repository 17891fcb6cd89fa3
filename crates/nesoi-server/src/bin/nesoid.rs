//! Nesoi Server Daemon
//!
//! The `nesoid` binary:
//! - Opens the database over the in-memory KV driver
//! - Serves the line protocol over TCP
//! - Shuts down on SIGTERM/SIGINT
//!
//! # Usage
//!
//! ```bash
//! # Start server with default settings
//! nesoid
//!
//! # Start on a custom port
//! nesoid --port 3307
//!
//! # Use configuration file
//! nesoid --config /etc/nesoi/nesoid.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nesoi_kv::MemoryDriver;
use nesoi_server::{Database, Server, ServerConfig};

/// Nesoi Server Daemon
#[derive(Parser, Debug)]
#[command(
    name = "nesoid",
    version,
    about = "Nesoi database server",
    long_about = "Nesoi is a MySQL-compatible relational front end over a key-value store.\n\n\
                  This daemon starts the server and listens for client connections."
)]
struct Args {
    /// Host address to bind to
    #[arg(short = 'H', long, env = "NESOI_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short = 'P', long, env = "NESOI_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "NESOI_LOG_LEVEL")]
    log_level: Option<String>,

    /// Maximum number of connections
    #[arg(long, env = "NESOI_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Database selected for new connections
    #[arg(long, env = "NESOI_DEFAULT_DATABASE")]
    default_database: Option<String>,

    /// Keys requested per KV scan page
    #[arg(long, env = "NESOI_SCAN_BATCH_SIZE")]
    scan_batch_size: Option<usize>,

    /// Print configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;

    // Print config and exit if requested
    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    init_logging(&args, &config);

    run_server(config).await
}

fn init_logging(args: &Args, config: &ServerConfig) {
    let level = if args.verbose {
        "debug"
    } else {
        &config.log_level
    };

    let filter = EnvFilter::try_new(format!(
        "nesoi_server={level},nesoi_sql={level},nesoi_kv={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = if let Some(path) = &args.config {
        ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?
    } else {
        ServerConfig::default()
    };

    // Flags and environment win over the file
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }
    if let Some(db) = &args.default_database {
        config.default_database = db.clone();
    }
    if let Some(size) = args.scan_batch_size {
        config.scan_batch_size = size;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    info!("Nesoi v{} starting", env!("CARGO_PKG_VERSION"));

    let db = Database::open(Arc::new(MemoryDriver::new()), config.database_config())
        .context("Failed to open database")?;
    let db = Arc::new(db);

    let server = Server::bind(db.clone(), config.socket_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.socket_addr()))?;

    info!("Server configuration:");
    info!("  Listen address: {}", server.local_addr()?);
    info!("  Max connections: {}", config.max_connections);
    info!("  Default database: {}", config.default_database);
    info!("Press Ctrl+C to shutdown");

    tokio::select! {
        result = server.serve() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(anyhow::anyhow!("Server error: {}", e));
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    let stats = db.stats();
    if stats.active_connections > 0 {
        warn!("Closing {} active connections", stats.active_connections);
    }

    info!("Server stopped after {:?}", stats.uptime);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
