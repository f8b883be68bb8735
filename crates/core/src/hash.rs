//! 128-bit content digests used to tell apart files of equal size

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Number of bytes read from disk per hasher update
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Length of a digest in bytes
pub const DIGEST_LEN: usize = 16;

/// A 128-bit content fingerprint
///
/// Produced by BLAKE3 in extended-output mode, truncated to 16 bytes.
/// Digests are never persisted; every pass recomputes them.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Get the digest as a byte slice
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex rendering (32 characters)
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_hasher(hasher: &blake3::Hasher) -> Self {
        let mut bytes = [0u8; DIGEST_LEN];
        hasher.finalize_xof().fill(&mut bytes);
        Self(bytes)
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Digest an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> Digest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    Digest::from_hasher(&hasher)
}

/// Digest a file, streaming it in [`CHUNK_SIZE`] chunks
pub fn hash_file(path: &Path) -> io::Result<Digest> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = blake3::Hasher::new();

    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Digest::from_hasher(&hasher))
}
