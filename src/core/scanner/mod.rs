//! # Scanner Module
//!
//! Walks source roots and turns every regular file into a [`WorkItem`].
//!
//! Each item knows where it came from and where it should land: the
//! destination path is the destination root joined with the file's path
//! relative to the source root it was found under.
//!
//! ## Example
//! ```rust,ignore
//! use dedup_merge::core::scanner::{TreeWalker, WalkConfig};
//!
//! let (tx, rx) = crossbeam_channel::bounded(0);
//! let walker = TreeWalker::new(WalkConfig::default(), null_sender());
//! let summary = walker.walk(&["/backups/2019".into()], Path::new("/merged"), tx);
//! ```

mod walker;

pub use walker::{destination_for, TreeWalker, WalkConfig};

use crate::error::WalkError;
use std::path::{Path, PathBuf};

/// A file on its way through the pipeline.
///
/// Created by the walker without a digest; the fingerprinter turns it into
/// a [`FingerprintedItem`](crate::core::hasher::FingerprintedItem).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    seq: u64,
    source_path: PathBuf,
    dest_path: PathBuf,
}

impl WorkItem {
    /// Create a work item. `seq` is the walker's emission number.
    pub fn new(seq: u64, source_path: PathBuf, dest_path: PathBuf) -> Self {
        Self {
            seq,
            source_path,
            dest_path,
        }
    }

    /// Position of this item in walk order
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Absolute path of the source file
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Where the file lands in the destination tree
    pub fn dest_path(&self) -> &Path {
        &self.dest_path
    }
}

/// Result of walking all source roots
#[derive(Debug, Default)]
pub struct WalkSummary {
    /// Roots that were walked (missing or invalid roots are not counted)
    pub roots_walked: usize,
    /// Regular files handed to the fingerprinter
    pub files_found: usize,
    /// Errors that occurred during walking (non-fatal)
    pub errors: Vec<WalkError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_item_keeps_paths_as_given() {
        let item = WorkItem::new(
            3,
            PathBuf::from("/backups/a/x.txt"),
            PathBuf::from("/merged/x.txt"),
        );

        assert_eq!(item.seq(), 3);
        assert_eq!(item.source_path(), Path::new("/backups/a/x.txt"));
        assert_eq!(item.dest_path(), Path::new("/merged/x.txt"));
    }
}
