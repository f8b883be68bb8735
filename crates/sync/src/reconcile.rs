//! One-way reconciliation of a replica tree against a source tree
//!
//! A pass is two full traversals. Propagation walks the source and creates,
//! copies or recopies whatever the replica lacks. Pruning then walks the
//! replica and removes everything the source no longer has. No state is
//! carried between passes.

use crate::report::{Reporter, SyncEvent, SyncStats};
use crate::stop::StopSignal;
use mirror_core::replica;
use mirror_core::tree::{relative_path, resolve_path};
use mirror_core::{EntryKind, FsOp, Result, SyncError, TreeEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Mirrors `source` into `replica`
pub struct Reconciler<R> {
    source: PathBuf,
    replica: PathBuf,
    reporter: R,
    stop: StopSignal,
}

impl<R: Reporter> Reconciler<R> {
    /// Create a reconciler
    ///
    /// Fails with [`SyncError::Configuration`] when `source` is not an
    /// existing directory. `replica` may be missing; the first pass creates it.
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>, reporter: R) -> Result<Self> {
        let source = source.into();
        let replica = replica.into();

        if !source.is_dir() {
            return Err(SyncError::Configuration(format!(
                "source folder does not exist or is not a directory: {}",
                source.display()
            )));
        }
        let resolved_source = resolve_path(&source).map_err(|e| {
            SyncError::Configuration(format!("cannot resolve {}: {}", source.display(), e))
        })?;
        let resolved_replica = resolve_path(&replica).map_err(|e| {
            SyncError::Configuration(format!("cannot resolve {}: {}", replica.display(), e))
        })?;
        if resolved_replica.starts_with(&resolved_source)
            || resolved_source.starts_with(&resolved_replica)
        {
            return Err(SyncError::Configuration(format!(
                "source {} and replica {} must not contain each other",
                source.display(),
                replica.display()
            )));
        }

        Ok(Self {
            source,
            replica,
            reporter,
            stop: StopSignal::new(),
        })
    }

    /// Share a stop signal with the caller
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn replica(&self) -> &Path {
        &self.replica
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Run one full pass
    ///
    /// Soft failures are reported and counted in [`SyncStats::failed`].
    /// Errors returned from here abort the pass: the source root became
    /// unreadable, the replica root could not be prepared, or a stop was
    /// requested.
    pub fn reconcile(&self) -> Result<SyncStats> {
        let mut stats = SyncStats::default();

        if !self.source.is_dir() {
            return Err(SyncError::traversal(
                &self.source,
                io::Error::new(io::ErrorKind::NotFound, "source root is not a directory"),
            ));
        }

        self.prepare_replica_root(&mut stats)?;
        self.propagate(&mut stats)?;
        self.prune(&mut stats)?;

        self.reporter.report(SyncEvent::PassComplete(stats));
        Ok(stats)
    }

    fn prepare_replica_root(&self, stats: &mut SyncStats) -> Result<()> {
        // The root itself is followed if it is a link
        match fs::metadata(&self.replica) {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(_) => {
                replica::remove_entry(&self.replica, EntryKind::File)?;
                self.record(stats, SyncEvent::DeletedFile(self.replica.clone()));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if fs::symlink_metadata(&self.replica).is_ok() {
                    // Dangling link
                    replica::remove_entry(&self.replica, EntryKind::Symlink)?;
                    self.record(stats, SyncEvent::DeletedFile(self.replica.clone()));
                }
            }
            Err(e) => return Err(SyncError::traversal(&self.replica, e)),
        }

        replica::create_dir(&self.replica)?;
        self.record(stats, SyncEvent::CreatedDirectory(self.replica.clone()));
        Ok(())
    }

    fn propagate(&self, stats: &mut SyncStats) -> Result<()> {
        let walker = WalkDir::new(&self.source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for item in walker {
            self.check_stop()?;

            let walked = match item {
                Ok(walked) => walked,
                Err(e) => {
                    self.walk_error(&self.source, e, stats)?;
                    continue;
                }
            };

            let outcome = TreeEntry::from_walk(&self.source, &walked)
                .and_then(|entry| self.propagate_entry(&entry, stats));
            if let Err(e) = outcome {
                self.soft_failure(e, stats)?;
            }
        }

        Ok(())
    }

    fn propagate_entry(&self, entry: &TreeEntry, stats: &mut SyncStats) -> Result<()> {
        let target = self.replica.join(entry.relative());
        let existing = TreeEntry::lookup(&self.replica, entry.relative())?;

        match entry.kind() {
            EntryKind::Directory => match existing {
                Some(found) if found.kind().is_dir() => {}
                Some(found) => {
                    self.remove_replica_entry(&found, stats)?;
                    replica::create_dir(&target)?;
                    self.record(stats, SyncEvent::CreatedDirectory(target));
                }
                None => {
                    replica::create_dir(&target)?;
                    self.record(stats, SyncEvent::CreatedDirectory(target));
                }
            },
            EntryKind::File => match existing {
                Some(found) if found.kind() == EntryKind::File => {
                    if found.size() != entry.size() {
                        replica::copy_file(entry.path(), &target)?;
                        self.record(stats, SyncEvent::UpdatedFileSizeChanged(target));
                    } else if entry.digest()? != found.digest()? {
                        replica::copy_file(entry.path(), &target)?;
                        self.record(stats, SyncEvent::UpdatedFile(target));
                    }
                }
                Some(found) => {
                    self.remove_replica_entry(&found, stats)?;
                    replica::copy_file(entry.path(), &target)?;
                    self.record(stats, SyncEvent::CreatedFile(target));
                }
                None => {
                    replica::copy_file(entry.path(), &target)?;
                    self.record(stats, SyncEvent::CreatedFile(target));
                }
            },
            EntryKind::Symlink | EntryKind::Other => {
                debug!("Skipping special entry: {}", entry.path().display());
            }
        }

        Ok(())
    }

    fn prune(&self, stats: &mut SyncStats) -> Result<()> {
        self.ensure_root(&self.source)?;

        let mut walker = WalkDir::new(&self.replica)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(item) = walker.next() {
            self.check_stop()?;

            let walked = match item {
                Ok(walked) => walked,
                Err(e) => {
                    self.walk_error(&self.replica, e, stats)?;
                    continue;
                }
            };

            let relative = match relative_path(&self.replica, walked.path()) {
                Ok(relative) => relative,
                Err(e) => {
                    self.soft_failure(e, stats)?;
                    continue;
                }
            };

            match TreeEntry::lookup(&self.source, &relative) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    // A missing source root makes every entry look deleted
                    self.ensure_root(&self.source)?;

                    let kind = EntryKind::from_file_type(walked.file_type());
                    if kind.is_dir() {
                        // Everything below goes with it
                        walker.skip_current_dir();
                    }
                    let path = walked.path().to_path_buf();
                    match replica::remove_entry(&path, kind) {
                        Ok(()) if kind.is_dir() => {
                            self.record(stats, SyncEvent::DeletedDirectory(path))
                        }
                        Ok(()) => self.record(stats, SyncEvent::DeletedFile(path)),
                        Err(e) => self.soft_failure(e, stats)?,
                    }
                }
                Err(e) => self.soft_failure(e, stats)?,
            }
        }

        Ok(())
    }

    /// Remove a replica entry whose type disagrees with the source
    fn remove_replica_entry(&self, found: &TreeEntry, stats: &mut SyncStats) -> Result<()> {
        replica::remove_entry(found.path(), found.kind())?;
        let path = found.path().to_path_buf();
        if found.kind().is_dir() {
            self.record(stats, SyncEvent::DeletedDirectory(path));
        } else {
            self.record(stats, SyncEvent::DeletedFile(path));
        }
        Ok(())
    }

    /// Walk errors are soft unless the root itself is gone
    fn walk_error(&self, root: &Path, err: walkdir::Error, stats: &mut SyncStats) -> Result<()> {
        let depth = err.depth();
        let path = err.path().map(Path::to_path_buf);
        let source = io::Error::from(err);

        if depth == 0 || !root.is_dir() {
            return Err(SyncError::traversal(root, source));
        }

        let path = path.unwrap_or_else(|| root.to_path_buf());
        self.soft_failure(SyncError::file_access(FsOp::ReadDir, path, source), stats)
    }

    /// Abort the pass if `root` is no longer a directory
    fn ensure_root(&self, root: &Path) -> Result<()> {
        if root.is_dir() {
            return Ok(());
        }
        Err(SyncError::traversal(
            root,
            io::Error::new(io::ErrorKind::NotFound, "root disappeared during the pass"),
        ))
    }

    /// Report a per-entry failure; anything else aborts the pass
    ///
    /// Entry failures caused by a vanished root are escalated.
    fn soft_failure(&self, err: SyncError, stats: &mut SyncStats) -> Result<()> {
        match err {
            SyncError::FileAccess { ref path, .. } => {
                self.ensure_root(&self.source)?;
                self.ensure_root(&self.replica)?;

                stats.failed += 1;
                self.reporter.report(SyncEvent::EntryFailed {
                    path: path.clone(),
                    error: err.to_string(),
                });
                Ok(())
            }
            fatal => Err(fatal),
        }
    }

    fn record(&self, stats: &mut SyncStats, event: SyncEvent) {
        match event {
            SyncEvent::CreatedDirectory(_) | SyncEvent::CreatedFile(_) => stats.created += 1,
            SyncEvent::UpdatedFile(_) | SyncEvent::UpdatedFileSizeChanged(_) => stats.updated += 1,
            SyncEvent::DeletedFile(_) | SyncEvent::DeletedDirectory(_) => stats.deleted += 1,
            _ => {}
        }
        self.reporter.report(event);
    }

    fn check_stop(&self) -> Result<()> {
        if self.stop.is_triggered() {
            return Err(SyncError::Interrupted);
        }
        Ok(())
    }
}
