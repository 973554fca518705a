//! In-memory index backend for testing.

use super::DigestIndex;
use crate::core::hasher::ContentDigest;
use crate::error::IndexError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// In-memory digest index
///
/// Useful for tests and for embedding the pipeline where no on-disk store
/// is wanted.
#[derive(Default)]
pub struct InMemoryIndex {
    entries: RwLock<HashMap<ContentDigest, PathBuf>>,
}

impl InMemoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }
}

impl DigestIndex for InMemoryIndex {
    fn get(&self, digest: &ContentDigest) -> Result<Option<PathBuf>, IndexError> {
        let entries = self.entries.read().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })?;

        Ok(entries.get(digest).cloned())
    }

    fn set(&self, digest: &ContentDigest, source: &Path) -> Result<(), IndexError> {
        let mut entries = self.entries.write().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })?;

        entries
            .entry(*digest)
            .or_insert_with(|| source.to_path_buf());
        Ok(())
    }

    fn len(&self) -> Result<usize, IndexError> {
        let entries = self.entries.read().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })?;

        Ok(entries.len())
    }
}
