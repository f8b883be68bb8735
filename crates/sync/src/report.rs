//! Reporting of synchronization events
//!
//! The reconciler and scheduler never log directly. They emit [`SyncEvent`]s
//! into a [`Reporter`], which the binary backs with `tracing` and tests back
//! with an in-memory recorder.

use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

/// Counters for a single pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Directories and files created in the replica
    pub created: usize,
    /// Files recopied because their content differed
    pub updated: usize,
    /// Files and directory roots removed from the replica
    pub deleted: usize,
    /// Entries skipped after a soft failure
    pub failed: usize,
}

impl SyncStats {
    /// Number of replica mutations performed
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// True when the pass changed nothing and hit no failures
    pub fn is_noop(&self) -> bool {
        self.mutations() == 0 && self.failed == 0
    }
}

impl fmt::Display for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} failed",
            self.created, self.updated, self.deleted, self.failed
        )
    }
}

/// Something worth recording during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    CreatedDirectory(PathBuf),
    CreatedFile(PathBuf),
    /// Same size, different digest
    UpdatedFile(PathBuf),
    UpdatedFileSizeChanged(PathBuf),
    DeletedFile(PathBuf),
    DeletedDirectory(PathBuf),
    /// Soft failure; the entry is retried next pass
    EntryFailed { path: PathBuf, error: String },
    PassComplete(SyncStats),
    /// Pass aborted; the scheduler keeps going
    PassFailed(String),
    Interrupted,
}

impl SyncEvent {
    /// Severity the event is logged at
    pub fn level(&self) -> Level {
        match self {
            SyncEvent::EntryFailed { .. } | SyncEvent::PassFailed(_) => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Replica path a mutation event refers to
    pub fn path(&self) -> Option<&Path> {
        match self {
            SyncEvent::CreatedDirectory(p)
            | SyncEvent::CreatedFile(p)
            | SyncEvent::UpdatedFile(p)
            | SyncEvent::UpdatedFileSizeChanged(p)
            | SyncEvent::DeletedFile(p)
            | SyncEvent::DeletedDirectory(p) => Some(p),
            SyncEvent::EntryFailed { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the event records a replica mutation
    pub fn is_mutation(&self) -> bool {
        self.path().is_some() && !matches!(self, SyncEvent::EntryFailed { .. })
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::CreatedDirectory(p) => write!(f, "Created directory: {}", p.display()),
            SyncEvent::CreatedFile(p) => write!(f, "Copied file: {}", p.display()),
            SyncEvent::UpdatedFile(p) => write!(f, "Updated file: {}", p.display()),
            SyncEvent::UpdatedFileSizeChanged(p) => {
                write!(f, "Updated file due to size change: {}", p.display())
            }
            SyncEvent::DeletedFile(p) => write!(f, "Deleted file: {}", p.display()),
            SyncEvent::DeletedDirectory(p) => write!(f, "Deleted directory: {}", p.display()),
            SyncEvent::EntryFailed { error, .. } => write!(f, "Skipped entry: {}", error),
            SyncEvent::PassComplete(stats) => write!(f, "Synchronization complete ({})", stats),
            SyncEvent::PassFailed(error) => {
                write!(f, "An error occurred during synchronization: {}", error)
            }
            SyncEvent::Interrupted => f.write_str("Synchronization interrupted by user."),
        }
    }
}

/// Sink for synchronization events
pub trait Reporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn report(&self, event: SyncEvent) {
        (**self).report(event)
    }
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn report(&self, event: SyncEvent) {
        (**self).report(event)
    }
}

/// Forwards events to `tracing` at their [`SyncEvent::level`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: SyncEvent) {
        if event.level() == Level::ERROR {
            tracing::error!("{}", event);
        } else {
            tracing::info!("{}", event);
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<SyncEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Recorded mutation events only
    pub fn mutations(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_mutation())
            .cloned()
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: SyncEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_display() {
        let stats = SyncStats {
            created: 2,
            updated: 1,
            deleted: 0,
            failed: 3,
        };
        assert_eq!(stats.to_string(), "2 created, 1 updated, 0 deleted, 3 failed");
        assert_eq!(stats.mutations(), 3);
        assert!(!stats.is_noop());
        assert!(SyncStats::default().is_noop());
    }

    #[test]
    fn test_event_levels() {
        assert_eq!(SyncEvent::CreatedFile("a".into()).level(), Level::INFO);
        assert_eq!(SyncEvent::PassFailed("boom".into()).level(), Level::ERROR);
        assert_eq!(
            SyncEvent::EntryFailed {
                path: "a".into(),
                error: "denied".into()
            }
            .level(),
            Level::ERROR
        );
    }

    #[test]
    fn test_mutation_classification() {
        assert!(SyncEvent::DeletedDirectory("sub".into()).is_mutation());
        assert!(!SyncEvent::PassComplete(SyncStats::default()).is_mutation());
        assert!(!SyncEvent::EntryFailed {
            path: "a".into(),
            error: "x".into()
        }
        .is_mutation());
    }

    #[test]
    fn test_recording_reporter_through_arc() {
        let recorder = Arc::new(RecordingReporter::new());
        let shared: Arc<RecordingReporter> = Arc::clone(&recorder);
        shared.report(SyncEvent::CreatedFile("a.txt".into()));
        shared.report(SyncEvent::PassComplete(SyncStats::default()));

        assert_eq!(recorder.mutations().len(), 1);
        assert_eq!(recorder.take().len(), 2);
        assert!(recorder.events().is_empty());
    }
}
