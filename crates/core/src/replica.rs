//! Mutations applied to the replica tree

use crate::error::{FsOp, Result, SyncError};
use crate::tree::EntryKind;
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;

/// Prefix of in-flight copy files inside replica directories
pub const TEMP_PREFIX: &str = ".foldersync-";

/// Create a directory and any missing ancestors
pub fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| SyncError::file_access(FsOp::CreateDir, path, e))
}

/// Copy `source` over `target` atomically
///
/// Data goes to a temporary file next to `target`, which receives the
/// source's permission bits and modification time before being renamed into
/// place. Readers of `target` see either the old or the new content, never
/// a mix. The temporary file is removed if anything fails.
pub fn copy_file(source: &Path, target: &Path) -> Result<()> {
    let copy_err = |e: io::Error| SyncError::file_access(FsOp::Copy, target, e);

    let parent = target.parent().ok_or_else(|| {
        copy_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "target has no parent directory",
        ))
    })?;

    let mut reader =
        File::open(source).map_err(|e| SyncError::file_access(FsOp::Copy, source, e))?;
    let metadata = reader
        .metadata()
        .map_err(|e| SyncError::file_access(FsOp::Copy, source, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(parent)
        .map_err(copy_err)?;

    io::copy(&mut reader, tmp.as_file_mut()).map_err(copy_err)?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    let atime = FileTime::from_last_access_time(&metadata);
    filetime::set_file_handle_times(tmp.as_file(), Some(atime), Some(mtime)).map_err(copy_err)?;
    tmp.as_file()
        .set_permissions(metadata.permissions())
        .map_err(copy_err)?;

    tmp.persist(target).map_err(|e| copy_err(e.error))?;
    Ok(())
}

/// Remove a replica entry: recursively for directories, a single unlink otherwise
pub fn remove_entry(path: &Path, kind: EntryKind) -> Result<()> {
    if kind.is_dir() {
        fs::remove_dir_all(path).map_err(|e| SyncError::file_access(FsOp::DeleteDir, path, e))
    } else {
        fs::remove_file(path).map_err(|e| SyncError::file_access(FsOp::DeleteFile, path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_file_creates_and_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.txt");
        let target = temp_dir.path().join("dst.txt");

        fs::write(&source, b"first").unwrap();
        copy_file(&source, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"first");

        fs::write(&source, b"second version").unwrap();
        copy_file(&source, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second version");
    }

    #[test]
    fn test_copy_file_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.txt");
        fs::write(&source, b"data").unwrap();
        fs::create_dir(temp_dir.path().join("out")).unwrap();

        copy_file(&source, &temp_dir.path().join("out/dst.txt")).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path().join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("dst.txt")]);
    }

    #[test]
    fn test_copy_file_preserves_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("src.txt");
        let target = temp_dir.path().join("dst.txt");
        fs::write(&source, b"old").unwrap();

        let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3600));
        filetime::set_file_mtime(&source, old).unwrap();

        copy_file(&source, &target).unwrap();

        let copied = FileTime::from_last_modification_time(&fs::metadata(&target).unwrap());
        assert_eq!(copied.unix_seconds(), old.unix_seconds());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("script.sh");
        let target = temp_dir.path().join("copy.sh");
        fs::write(&source, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&source, fs::Permissions::from_mode(0o750)).unwrap();

        copy_file(&source, &target).unwrap();

        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }

    #[test]
    fn test_copy_missing_source_is_file_access_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = copy_file(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("dst"),
        )
        .unwrap_err();
        assert!(err.is_soft());
    }

    #[test]
    fn test_remove_entry_directory_recursively() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sub");
        fs::create_dir_all(dir.join("deeper")).unwrap();
        fs::write(dir.join("deeper/b.txt"), b"b").unwrap();

        remove_entry(&dir, EntryKind::Directory).unwrap();
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_entry_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();

        remove_entry(&file, EntryKind::File).unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_create_dir_with_ancestors() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("x/y/z");
        create_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
