//! # Transfer Module
//!
//! Materializes a file's content at its destination path.
//!
//! ## Modes
//! - **Copy** - Exclusive-create the destination and stream the bytes over.
//!   The source is never touched.
//! - **Move** - Rename in place when possible, otherwise fall back to a copy.
//!
//! A destination that already exists is never overwritten: at that point
//! it is a naming collision, not duplicate content.

mod executor;

pub use executor::{copy_exclusive, RenameFn, Transferer};

use serde::{Deserialize, Serialize};

/// How files reach the destination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Copy files to destination (keep originals)
    #[default]
    Copy,
    /// Move files to destination
    Move,
}

/// What happens to the source when a move has to fall back to copying
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveFallback {
    /// Leave the source where it is
    #[default]
    KeepSource,
    /// Delete the source once the copy has completed
    RemoveSource,
}

/// The path a successful transfer took
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferMethod {
    /// Renamed in place
    Renamed,
    /// Copied (copy mode)
    Copied,
    /// Rename failed, content was copied instead
    CopiedAfterRenameFailed { source_removed: bool },
}

/// Result of a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    pub method: TransferMethod,
    pub bytes: u64,
}
