//! # Merge Module
//!
//! The last pipeline stage: decides, per fingerprinted file, whether its
//! content still needs to be placed and places it.
//!
//! ## Dedup Rule
//! 1. Look the digest up in the index
//! 2. Not found - transfer, then record the digest on success
//! 3. Found - duplicate, skip
//! 4. Lookup failed - skip, touch nothing
//!
//! A failed transfer leaves the digest unrecorded, so a later file with the
//! same content gets its own attempt.

mod engine;

pub use engine::{MergeEngine, MergeOutcome};

use serde::{Deserialize, Serialize};

/// Counters collected by the merge engine over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Files whose content was placed in the destination
    pub transferred: usize,
    /// Files skipped because their content was already placed
    pub duplicates: usize,
    /// Files whose transfer failed
    pub transfer_failures: usize,
    /// Index lookups that failed (the file was skipped) plus index writes
    /// that failed after the file was placed
    pub index_errors: usize,
    /// Files the fingerprinter could not read
    pub hash_failures: usize,
    /// Moves that had to fall back to copying
    pub fallback_copies: usize,
    /// Bytes placed in the destination
    pub bytes_transferred: u64,
}

impl MergeReport {
    /// Per-file problems seen by the merge engine, including index writes
    /// that failed for files which were still placed
    pub fn failures(&self) -> usize {
        self.transfer_failures + self.index_errors + self.hash_failures
    }
}
