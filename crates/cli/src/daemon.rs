//! Synchronization daemon lifecycle

use crate::config::SyncConfig;
use anyhow::{Context, Result};
use mirror_sync::{PeriodicSync, Reconciler, Reporter, StopReason, TracingReporter};
use tokio::signal;
use tracing::{info, warn};

/// How long to keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One pass, then exit
    Once,
    /// Until SIGINT or SIGTERM
    Forever,
}

/// Run the daemon with the `tracing` reporter until interrupted
pub async fn start(config: &SyncConfig, mode: RunMode) -> Result<()> {
    let scheduler = build(config, TracingReporter)?;
    run(scheduler, mode, shutdown_signal()).await
}

/// Build the scheduler for `config`
pub fn build<R: Reporter + 'static>(config: &SyncConfig, reporter: R) -> Result<PeriodicSync<R>> {
    if config.replica_missing() {
        warn!(
            "Replica folder does not exist. It will be created at: {}",
            config.replica.display()
        );
    }

    let reconciler = Reconciler::new(&config.source, &config.replica, reporter)
        .context("Invalid synchronization roots")?;

    info!(
        "Starting folder synchronization: {} -> {}",
        config.source.display(),
        config.replica.display()
    );
    info!("Synchronization interval: {} seconds", config.interval_secs);

    Ok(PeriodicSync::new(reconciler, config.interval()))
}

/// Drive `scheduler` in the requested mode
pub async fn run<R, F>(scheduler: PeriodicSync<R>, mode: RunMode, shutdown: F) -> Result<()>
where
    R: Reporter + 'static,
    F: std::future::Future<Output = ()>,
{
    match mode {
        RunMode::Once => {
            scheduler.run_once().await?;
            Ok(())
        }
        RunMode::Forever => match scheduler.run(shutdown).await? {
            StopReason::Interrupted => Ok(()),
        },
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
