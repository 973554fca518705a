//! Digest index trait definition.

use crate::core::hasher::ContentDigest;
use crate::error::IndexError;
use std::path::{Path, PathBuf};

/// A "have we already placed this content?" store.
///
/// Absence is reported as `Ok(None)`, which keeps it distinguishable from a
/// failed lookup. Entries are never updated or removed during a run.
pub trait DigestIndex: Send + Sync {
    /// Look up a digest, returning the source path that first placed it
    fn get(&self, digest: &ContentDigest) -> Result<Option<PathBuf>, IndexError>;

    /// Record that content with `digest` was placed from `source`.
    ///
    /// Recording a digest that is already present keeps the first entry.
    fn set(&self, digest: &ContentDigest, source: &Path) -> Result<(), IndexError>;

    /// Whether a digest has been recorded
    fn contains(&self, digest: &ContentDigest) -> Result<bool, IndexError> {
        Ok(self.get(digest)?.is_some())
    }

    /// Number of recorded digests
    fn len(&self) -> Result<usize, IndexError>;

    /// Whether nothing has been recorded yet
    fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len()? == 0)
    }
}
