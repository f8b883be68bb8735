//! Core primitives for one-way folder mirroring
//!
//! This crate provides:
//! - 128-bit streaming content digests
//! - Tree entries observed while walking source and replica roots
//! - Atomic replica mutations (copy, create, delete)
//! - The synchronization error taxonomy

pub mod error;
pub mod hash;
pub mod replica;
pub mod tree;

// Re-exports
pub use error::{FsOp, Result, SyncError};
pub use hash::{hash_bytes, hash_file, Digest};
pub use tree::{EntryKind, TreeEntry};
