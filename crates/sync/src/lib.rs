//! Folder mirroring engine
//!
//! This crate provides:
//! - The two-pass [`Reconciler`] (propagation, then pruning)
//! - Event reporting through an injected [`Reporter`]
//! - The [`PeriodicSync`] loop with cooperative [`StopSignal`] handling

pub mod reconcile;
pub mod report;
pub mod schedule;
pub mod stop;

// Re-exports
pub use reconcile::Reconciler;
pub use report::{RecordingReporter, Reporter, SyncEvent, SyncStats, TracingReporter};
pub use schedule::{PeriodicSync, StopReason};
pub use stop::StopSignal;
