//! Error taxonomy for synchronization

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filesystem operation that failed, carried for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOp {
    Stat,
    ReadDir,
    Hash,
    Copy,
    CreateDir,
    DeleteFile,
    DeleteDir,
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FsOp::Stat => "stat",
            FsOp::ReadDir => "read directory",
            FsOp::Hash => "hash",
            FsOp::Copy => "copy",
            FsOp::CreateDir => "create directory",
            FsOp::DeleteFile => "delete file",
            FsOp::DeleteDir => "delete directory",
        };
        f.write_str(name)
    }
}

/// Errors raised while configuring or running a synchronization pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid startup settings; nothing has been touched yet
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single entry could not be read, hashed, copied or deleted
    #[error("failed to {op} {}: {source}", path.display())]
    FileAccess {
        op: FsOp,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A tree root could not be traversed; the pass is abandoned
    #[error("cannot traverse {}: {source}", root.display())]
    Traversal {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stop was requested between two entries
    #[error("synchronization interrupted")]
    Interrupted,
}

impl SyncError {
    pub fn file_access(op: FsOp, path: impl AsRef<Path>, source: io::Error) -> Self {
        SyncError::FileAccess {
            op,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn traversal(root: impl AsRef<Path>, source: io::Error) -> Self {
        SyncError::Traversal {
            root: root.as_ref().to_path_buf(),
            source,
        }
    }

    /// Whether this error only affects a single entry
    pub fn is_soft(&self) -> bool {
        matches!(self, SyncError::FileAccess { .. })
    }
}

/// Result type for synchronization operations
pub type Result<T> = std::result::Result<T, SyncError>;
