//! suretyd - flight-status oracle network simulator daemon.
//!
//! Startup sequence:
//! 1. Load and validate configuration (TOML file, CLI overrides on top).
//! 2. Build the identity pool and the simulated ledger.
//! 3. Run the registration coordinator once; abort if zero oracles
//!    registered (the process must not silently run with no coverage).
//! 4. Spawn the event dispatcher, the synthetic traffic generator, and the
//!    status endpoint; run until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use axum::Json;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use surety_core::ledger::memory::InMemoryLedger;
use surety_core::{IdentityPool, IndexRegistry, OracleNetConfig};
use surety_daemon::dispatcher::EventDispatcher;
use surety_daemon::registration::RegistrationCoordinator;
use surety_daemon::traffic::TrafficGenerator;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "suretyd", about = "Flight-status oracle network simulator")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "surety.toml")]
    config: PathBuf,

    /// Override the number of oracle identities to register
    #[arg(long)]
    oracles: Option<usize>,

    /// Override the synthetic traffic interval in milliseconds (0 disables)
    #[arg(long)]
    traffic_interval_ms: Option<u64>,

    /// Override the status endpoint port
    #[arg(long)]
    status_port: Option<u16>,

    /// Disable the status endpoint
    #[arg(long)]
    no_status: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    // Load configuration; a missing file means defaults, any other read or
    // parse failure is fatal.
    let mut config = if args.config.exists() {
        OracleNetConfig::from_file(&args.config).context("failed to load configuration")?
    } else {
        info!(path = %args.config.display(), "no configuration file; using defaults");
        OracleNetConfig::default()
    };
    if let Some(count) = args.oracles {
        config.oracles.count = count;
    }
    if let Some(interval) = args.traffic_interval_ms {
        config.traffic.interval_ms = interval;
    }
    if let Some(port) = args.status_port {
        config.status.port = port;
    }
    config.validate().context("invalid configuration")?;

    let pool = IdentityPool::simulated(config.oracles.pool_seed, config.oracles.pool_size);
    let ledger = Arc::new(InMemoryLedger::new(&config.ledger));
    let registry = Arc::new(IndexRegistry::new());
    let rpc_timeout = Duration::from_millis(config.dispatch.rpc_timeout_ms);

    // Registration phase: one pass over the oracle sub-range.
    let coordinator = RegistrationCoordinator::new(
        ledger.clone(),
        registry.clone(),
        config.oracles.stake_wei,
        rpc_timeout,
    );
    let report = coordinator
        .run(pool.oracle_range(config.oracles.pool_offset, config.oracles.count))
        .await;
    if report.is_empty() {
        bail!(
            "no oracle completed registration ({} attempted); refusing to run without coverage",
            config.oracles.count
        );
    }

    // Dispatch phase: runs for the life of the process.
    let dispatcher = Arc::new(EventDispatcher::new(
        ledger.clone(),
        registry,
        rpc_timeout,
        Duration::from_millis(config.dispatch.resubscribe_delay_ms),
    ));
    let dispatcher_task = tokio::spawn(dispatcher.run(0));

    let traffic_task = if config.traffic.interval_ms > 0 {
        let generator = TrafficGenerator::new(
            ledger.clone(),
            &pool,
            Duration::from_millis(config.traffic.interval_ms),
        );
        Some(tokio::spawn(generator.run()))
    } else {
        info!("synthetic traffic disabled");
        None
    };

    let status_task = if args.no_status {
        None
    } else {
        Some(tokio::spawn(serve_status(config.status.port)))
    };

    wait_for_shutdown().await;
    info!("shutdown signal received");

    dispatcher_task.abort();
    if let Some(task) = traffic_task {
        task.abort();
    }
    if let Some(task) = status_task {
        task.abort();
    }
    Ok(())
}

/// Initialize tracing to stdout or a file, mirroring the `--log-level`
/// filter syntax of `RUST_LOG`.
fn init_tracing(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .context("failed to open log file")?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    Ok(())
}

/// Serve the liveness route until aborted.
///
/// One static payload, no state dependency.
async fn serve_status(port: u16) {
    let app = Router::new().route(
        "/api",
        get(|| async {
            Json(serde_json::json!({
                "message": "flight-status oracle network simulator",
                "status": "ok",
            }))
        }),
    );

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(error) => {
            warn!(%addr, %error, "failed to bind status endpoint");
            return;
        }
    };
    info!(%addr, "status endpoint listening");
    if let Err(error) = axum::serve(listener, app).await {
        warn!(%error, "status endpoint terminated");
    }
}

/// Block until SIGINT or SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(error) => {
                warn!(%error, "failed to install SIGTERM handler; waiting on ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
