//! Periodic synchronization loop
//!
//! Runs a pass, waits for the configured interval, and repeats until a
//! shutdown future resolves. Each pass runs on a blocking worker so the loop
//! can keep listening for shutdown while files are being copied.

use crate::reconcile::Reconciler;
use crate::report::{Reporter, SyncEvent, SyncStats};
use anyhow::{Context, Result};
use mirror_core::SyncError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info};

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested
    Interrupted,
}

/// Drives a [`Reconciler`] on a fixed interval
pub struct PeriodicSync<R> {
    reconciler: Arc<Reconciler<R>>,

    /// Pause between the end of one pass and the start of the next
    interval: Duration,
}

impl<R: Reporter + 'static> PeriodicSync<R> {
    pub fn new(reconciler: Reconciler<R>, interval: Duration) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            interval,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<R> {
        &self.reconciler
    }

    /// Run a single pass off the async runtime
    pub async fn run_once(&self) -> Result<SyncStats> {
        let reconciler = Arc::clone(&self.reconciler);
        let stats = tokio::task::spawn_blocking(move || reconciler.reconcile())
            .await
            .context("Synchronization pass panicked")??;
        Ok(stats)
    }

    /// Run passes until `shutdown` resolves
    ///
    /// Failed passes are reported and the loop carries on with the next
    /// interval. When `shutdown` fires mid-pass the pass is stopped at the
    /// next entry boundary.
    pub async fn run<F>(self, shutdown: F) -> Result<StopReason>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!("Starting periodic synchronization (interval: {:?})", self.interval);

        loop {
            let reconciler = Arc::clone(&self.reconciler);
            let mut pass = tokio::task::spawn_blocking(move || reconciler.reconcile());

            let outcome = tokio::select! {
                outcome = &mut pass => outcome,
                _ = &mut shutdown => {
                    self.reconciler.stop_signal().trigger();
                    // Outcome is still reported, the loop stops either way
                    let _ = self.handle_outcome(pass.await);
                    return Ok(self.interrupted());
                }
            };

            if self.handle_outcome(outcome).is_some() {
                return Ok(self.interrupted());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    self.reconciler.stop_signal().trigger();
                    return Ok(self.interrupted());
                }
            }
        }
    }

    /// Report a finished pass; returns a stop reason if the pass was interrupted
    fn handle_outcome(
        &self,
        outcome: std::result::Result<mirror_core::Result<SyncStats>, JoinError>,
    ) -> Option<StopReason> {
        let reporter = self.reconciler.reporter();
        match outcome {
            Ok(Ok(stats)) => {
                debug!("Pass finished: {}", stats);
                None
            }
            Ok(Err(SyncError::Interrupted)) => Some(StopReason::Interrupted),
            Ok(Err(e)) => {
                reporter.report(SyncEvent::PassFailed(e.to_string()));
                None
            }
            Err(e) => {
                reporter.report(SyncEvent::PassFailed(format!("pass panicked: {}", e)));
                None
            }
        }
    }

    fn interrupted(&self) -> StopReason {
        self.reconciler.reporter().report(SyncEvent::Interrupted);
        StopReason::Interrupted
    }
}
