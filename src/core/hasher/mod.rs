//! # Hasher Module
//!
//! Fingerprints file content with a cryptographic digest.
//!
//! ## Supported Algorithms
//! - **SHA-256** - The default
//! - **BLAKE3** - Considerably faster on large files
//!
//! Both produce 32-byte digests. Two files are treated as duplicates when
//! their digests (and algorithms) are equal.
//!
//! ## Example
//! ```rust,ignore
//! use dedup_merge::core::hasher::{ContentHasher, DigestAlgorithm};
//!
//! let hasher = ContentHasher::new(DigestAlgorithm::Sha256);
//! let digest = hasher.hash_file(&path)?;
//! println!("{}", digest.to_hex());
//! ```

mod fingerprinter;

pub use fingerprinter::{Fingerprinted, Fingerprinter};

use crate::core::scanner::WorkItem;
use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Length in bytes of every supported digest
pub const DIGEST_LEN: usize = 32;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Available digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Stable name used in the index and in output
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Blake3 => "blake3",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-length content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    bytes: [u8; DIGEST_LEN],
    algorithm: DigestAlgorithm,
}

impl ContentDigest {
    /// Wrap raw digest bytes
    pub fn new(bytes: [u8; DIGEST_LEN], algorithm: DigestAlgorithm) -> Self {
        Self { bytes, algorithm }
    }

    /// The raw digest bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.bytes
    }

    /// The algorithm that produced this digest
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Lowercase hexadecimal form
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// A work item with its digest attached.
///
/// The digest is set exactly once, by [`WorkItem::with_digest`], and can't
/// be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintedItem {
    item: WorkItem,
    digest: ContentDigest,
}

impl FingerprintedItem {
    /// The underlying work item
    pub fn item(&self) -> &WorkItem {
        &self.item
    }

    /// The content digest
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// Position of this item in walk order
    pub fn seq(&self) -> u64 {
        self.item.seq()
    }

    /// Absolute path of the source file
    pub fn source_path(&self) -> &Path {
        self.item.source_path()
    }

    /// Where the file lands in the destination tree
    pub fn dest_path(&self) -> &Path {
        self.item.dest_path()
    }
}

impl WorkItem {
    /// Attach the content digest, completing the item.
    pub fn with_digest(self, digest: ContentDigest) -> FingerprintedItem {
        FingerprintedItem { item: self, digest }
    }
}

/// Streams file content through a digest function
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    algorithm: DigestAlgorithm,
}

enum DigestState {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl DigestState {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => {
                use sha2::Digest;
                DigestState::Sha256(sha2::Sha256::new())
            }
            DigestAlgorithm::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            DigestState::Sha256(hasher) => {
                use sha2::Digest;
                hasher.update(data);
            }
            DigestState::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize(self) -> [u8; DIGEST_LEN] {
        let mut bytes = [0u8; DIGEST_LEN];
        match self {
            DigestState::Sha256(hasher) => {
                use sha2::Digest;
                bytes.copy_from_slice(&hasher.finalize());
            }
            DigestState::Blake3(hasher) => {
                bytes.copy_from_slice(hasher.finalize().as_bytes());
            }
        }
        bytes
    }
}

impl ContentHasher {
    /// Create a hasher for the given algorithm
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Digest a byte slice
    pub fn hash_bytes(&self, data: &[u8]) -> ContentDigest {
        let mut state = DigestState::new(self.algorithm);
        state.update(data);
        ContentDigest::new(state.finalize(), self.algorithm)
    }

    /// Digest the full content of the file at `path`
    pub fn hash_file(&self, path: &Path) -> Result<ContentDigest, HashError> {
        let mut file = File::open(path).map_err(|source| HashError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.hash_reader(&mut file).map_err(|source| HashError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Digest everything `reader` yields until EOF
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<ContentDigest> {
        let mut state = DigestState::new(self.algorithm);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => state.update(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(ContentDigest::new(state.finalize(), self.algorithm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    // Well-known SHA-256 of "hello"
    const SHA256_HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn sha256_matches_known_vector() {
        let digest = ContentHasher::new(DigestAlgorithm::Sha256).hash_bytes(b"hello");
        assert_eq!(digest.to_hex(), SHA256_HELLO);
    }

    #[test]
    fn blake3_matches_reference_crate() {
        let digest = ContentHasher::new(DigestAlgorithm::Blake3).hash_bytes(b"hello");
        assert_eq!(digest.as_bytes(), blake3::hash(b"hello").as_bytes());
    }

    #[test]
    fn file_and_bytes_digests_agree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, "hello").unwrap();

        let hasher = ContentHasher::default();
        assert_eq!(hasher.hash_file(&path).unwrap(), hasher.hash_bytes(b"hello"));
    }

    #[test]
    fn content_larger_than_buffer_is_fully_hashed() {
        let data: Vec<u8> = (0..READ_BUFFER_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let hasher = ContentHasher::new(DigestAlgorithm::Sha256);

        let streamed = hasher.hash_reader(&mut Cursor::new(&data)).unwrap();
        assert_eq!(streamed, hasher.hash_bytes(&data));
    }

    #[test]
    fn different_algorithms_never_compare_equal() {
        let sha = ContentHasher::new(DigestAlgorithm::Sha256).hash_bytes(b"x");
        let blake = ContentHasher::new(DigestAlgorithm::Blake3).hash_bytes(b"x");
        assert_ne!(sha, blake);
    }

    #[test]
    fn missing_file_is_open_error() {
        let result = ContentHasher::default().hash_file(Path::new("/nonexistent/12345.bin"));
        assert!(matches!(result, Err(HashError::Open { .. })));
    }

    #[test]
    fn display_includes_algorithm() {
        let digest = ContentHasher::default().hash_bytes(b"hello");
        assert_eq!(digest.to_string(), format!("sha256:{}", SHA256_HELLO));
    }
}
