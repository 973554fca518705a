//! # Error Module
//!
//! Error types for the merge pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, digests, what went wrong
//! - **Per-file errors stay per-file** - walk, hash and transfer errors are
//!   logged by their stage and never reach [`DedupMergeError`]
//! - **Exit codes** - fatal errors map onto distinct process exit statuses

use std::path::PathBuf;
use thiserror::Error;

/// Process exit status: invalid command-line parameters
pub const EXIT_INVALID_PARAMS: u8 = 1 << 0;
/// Process exit status: the temporary index directory could not be created
pub const EXIT_CREATE_TMP_DIR_FAILED: u8 = 1 << 1;
/// Process exit status: the digest index could not be opened
pub const EXIT_OPEN_INDEX_FAILED: u8 = 1 << 2;

/// Errors that abort a run before any file is touched
#[derive(Error, Debug)]
pub enum DedupMergeError {
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Invalid parameters: {0}")]
    Config(String),
}

impl DedupMergeError {
    /// The process exit status this error maps to.
    pub fn exit_code(&self) -> u8 {
        match self {
            DedupMergeError::Index(IndexError::TempDirFailed { .. }) => {
                EXIT_CREATE_TMP_DIR_FAILED
            }
            DedupMergeError::Index(_) => EXIT_OPEN_INDEX_FAILED,
            DedupMergeError::Config(_) => EXIT_INVALID_PARAMS,
        }
    }
}

/// Errors that occur while walking source trees
#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Source root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Source root is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not under source root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// Errors that occur while fingerprinting file content
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur with the digest index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to create temporary index directory in {parent}: {source}")]
    TempDirFailed {
        parent: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open digest index at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Index query failed: {0}")]
    QueryFailed(String),

    #[error("Digest index at {path} is unusable (poisoned lock)")]
    Corrupted { path: PathBuf },
}

/// Errors that occur while placing a file at its destination
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Failed to create directory {path}: {source}")]
    CreateParent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Failed to open source {path}: {source}")]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create destination {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DedupMergeError>;
