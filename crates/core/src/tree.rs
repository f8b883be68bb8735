//! Tree entries observed while walking a source or replica root

use crate::error::{FsOp, Result, SyncError};
use crate::hash::{hash_file, Digest};
use std::cell::OnceCell;
use std::fs::{self, FileType, Metadata};
use std::io;
use std::path::{Path, PathBuf};

/// Type of tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// Symbolic link (never followed)
    Symlink,
    /// Sockets, fifos, devices
    Other,
}

impl EntryKind {
    /// Classify without following symlinks
    pub fn from_file_type(file_type: FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }

    pub fn is_dir(self) -> bool {
        self == EntryKind::Directory
    }
}

/// An entry of a tree, identified by its path relative to the tree root
///
/// Holds the metadata captured when the entry was observed. The content
/// digest of a file is computed on first request and reused afterwards;
/// entries live for a single pass only.
#[derive(Debug)]
pub struct TreeEntry {
    path: PathBuf,
    relative: PathBuf,
    kind: EntryKind,
    metadata: Metadata,
    digest: OnceCell<Digest>,
}

impl TreeEntry {
    /// Build an entry from a directory walk result
    pub fn from_walk(root: &Path, entry: &walkdir::DirEntry) -> Result<Self> {
        let path = entry.path().to_path_buf();
        let relative = relative_path(root, &path)?;
        let metadata = entry
            .metadata()
            .map_err(|e| SyncError::file_access(FsOp::Stat, &path, io::Error::from(e)))?;

        Ok(Self {
            kind: EntryKind::from_file_type(entry.file_type()),
            path,
            relative,
            metadata,
            digest: OnceCell::new(),
        })
    }

    /// Look up `relative` under `root` without following symlinks
    ///
    /// Returns `Ok(None)` only when nothing exists at that path; any other
    /// stat failure is reported as an error.
    pub fn lookup(root: &Path, relative: &Path) -> Result<Option<Self>> {
        let path = root.join(relative);
        match fs::symlink_metadata(&path) {
            Ok(metadata) => Ok(Some(Self {
                kind: EntryKind::from_file_type(metadata.file_type()),
                path,
                relative: relative.to_path_buf(),
                metadata,
                digest: OnceCell::new(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SyncError::file_access(FsOp::Stat, &path, e)),
        }
    }

    /// Absolute (root-joined) path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the tree root
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Size in bytes (meaningful for files)
    pub fn size(&self) -> u64 {
        self.metadata.len()
    }

    /// Content digest, computed on first use
    pub fn digest(&self) -> Result<Digest> {
        if let Some(digest) = self.digest.get() {
            return Ok(*digest);
        }
        let digest =
            hash_file(&self.path).map_err(|e| SyncError::file_access(FsOp::Hash, &self.path, e))?;
        let _ = self.digest.set(digest);
        Ok(digest)
    }
}

/// Strip `root` from `path`
pub fn relative_path(root: &Path, path: &Path) -> Result<PathBuf> {
    path.strip_prefix(root).map(Path::to_path_buf).map_err(|_| {
        SyncError::file_access(
            FsOp::Stat,
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is outside of {}", root.display()),
            ),
        )
    })
}

/// Absolute, symlink-free form of `path`, which need not exist yet
///
/// The nearest existing ancestor is canonicalized and the remaining
/// components are appended to it.
pub fn resolve_path(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut rest = Vec::new();
    let mut current = absolute.as_path();
    loop {
        match fs::canonicalize(current) {
            Ok(mut resolved) => {
                for component in rest.iter().rev() {
                    resolved.push(component);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let name = current.file_name().ok_or(e)?;
                rest.push(name.to_os_string());
                current = current
                    .parent()
                    .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            }
            Err(e) => return Err(e),
        }
    }
}
