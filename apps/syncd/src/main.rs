//! # famledger sync daemon
//!
//! Runs the offline sync engine without a UI: pushes locally edited records
//! to the ledger service on a fixed interval until the process is told to
//! stop.
//!
//! ## Usage
//! ```bash
//! # Periodic sync until Ctrl-C (config from the platform config dir)
//! cargo run -p famledger-syncd
//!
//! # One push cycle, then exit
//! cargo run -p famledger-syncd -- --once
//!
//! # Push, then refresh every kind from the server, then exit
//! cargo run -p famledger-syncd -- --force
//!
//! # Explicit config file, verbose logs
//! RUST_LOG=debug cargo run -p famledger-syncd -- --config ./sync.toml
//! ```

use famledger_db::{Database, DbConfig};
use famledger_sync::{
    ApiClient, CycleReport, SyncAgentBuilder, SyncConfig, SyncEventEmitter, SyncStatus,
};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// What the process does after the agent is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Daemon,
    Once,
    Force,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut run_mode = RunMode::Daemon;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--once" => run_mode = RunMode::Once,
            "--force" => run_mode = RunMode::Force,
            "--help" | "-h" => {
                println!("famledger sync daemon");
                println!();
                println!("Usage: syncd [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("      --once           Run one push cycle and exit");
                println!("      --force          Push, refresh from the server, and exit");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => {
                warn!(argument = %other, "Ignoring unknown argument");
            }
        }
        i += 1;
    }

    // A missing file falls back to defaults; a malformed one is fatal.
    let config = SyncConfig::load(config_path)?;

    info!(
        family_id = %config.family_id(),
        mode = %config.mode(),
        interval_secs = config.interval().as_secs(),
        server = %config.remote.base_url,
        "Starting famledger sync daemon"
    );

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::new(DbConfig::new(db_path)).await?;

    let api = Arc::new(ApiClient::new(&config.remote)?);
    let agent = SyncAgentBuilder::new(config)
        .with_standard_workers(&db, api)
        .with_emitter(Arc::new(LogEmitter))
        .build()?;

    let status = agent.refresh_pending_counts().await;
    info!(pending = status.pending_total(), "Local changes awaiting sync");

    let result = match run_mode {
        RunMode::Once => agent.sync_all_pending_data().await.map(|_| ()),
        RunMode::Force => {
            let family_id = agent.family_id().to_string();
            agent.force_sync(&family_id).await.map(|_| ())
        }
        RunMode::Daemon => {
            agent.start_periodic_sync().await;
            shutdown_signal().await;
            Ok(())
        }
    };

    agent.stop_sync().await;
    db.close().await;

    result?;
    info!("Sync daemon stopped");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,famledger=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Waits for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}

// =============================================================================
// Event Emitter
// =============================================================================

/// Writes agent events to the log; there is no UI to forward them to.
struct LogEmitter;

impl SyncEventEmitter for LogEmitter {
    fn emit_status(&self, status: &SyncStatus) {
        info!(
            syncing = status.is_syncing,
            pending = status.pending_total(),
            cycles = status.cycles_completed,
            "Sync status"
        );
    }

    fn emit_cycle(&self, report: &CycleReport) {
        info!(
            trigger = %report.trigger,
            outcome = %report.outcome(),
            attempted = report.total_attempted(),
            confirmed = report.total_confirmed(),
            failed = report.total_failed_records(),
            refreshed = report.total_refreshed(),
            "Sync cycle finished"
        );
    }

    fn emit_error(&self, message: &str, retryable: bool) {
        if retryable {
            warn!(error = %message, "Sync failed, will retry next cycle");
        } else {
            error!(error = %message, "Sync failed");
        }
    }
}
