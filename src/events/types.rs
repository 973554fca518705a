//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the merge pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Tree walking events
    Walk(WalkEvent),
    /// Fingerprinting events
    Hash(HashEvent),
    /// Merge engine events
    Merge(MergeEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events from the tree walker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalkEvent {
    /// A source root is about to be walked
    RootStarted { root: PathBuf },
    /// A regular file was found and handed off for hashing
    FileFound { path: PathBuf },
    /// An entry could not be read; walking continues
    Error { path: PathBuf, message: String },
    /// Every root has been walked
    Completed { files_found: usize },
}

/// Events from the fingerprinter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// A file was hashed and forwarded to the merge engine
    FileHashed { path: PathBuf, digest: String },
    /// A file could not be hashed and was dropped
    Error { path: PathBuf, message: String },
}

/// Events from the merge engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MergeEvent {
    /// New content was placed at its destination
    Transferred {
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    /// Content was already placed earlier in this run
    DuplicateSkipped { source: PathBuf, digest: String },
    /// The transfer failed; the digest was not recorded
    TransferFailed { source: PathBuf, message: String },
    /// The index lookup failed; the item was skipped
    IndexError { source: PathBuf, message: String },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Pipeline drained
    Completed { summary: MergeSummary },
}

/// Summary of a completed merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// Regular files found by the walker
    pub files_found: usize,
    /// Files whose content was placed in the destination
    pub transferred: usize,
    /// Files skipped because their content was already placed
    pub duplicates: usize,
    /// Files dropped by the walker, fingerprinter or merge engine
    pub failures: usize,
    /// Bytes placed in the destination
    pub bytes_transferred: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}
