//! Temporary home for the on-disk index.

use crate::error::IndexError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error};

const INDEX_FILE_NAME: &str = "index.db";

/// A freshly created directory holding one run's index database.
///
/// Call [`IndexDir::cleanup`] once the index is closed so that a failed
/// removal is reported; dropping the guard removes it silently.
#[derive(Debug)]
pub struct IndexDir {
    dir: TempDir,
}

impl IndexDir {
    /// Create a new empty directory under `parent`, or under the system
    /// temporary directory when `parent` is `None`.
    pub fn provision(parent: Option<&Path>) -> Result<Self, IndexError> {
        let parent = parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let dir = tempfile::Builder::new()
            .prefix("dedup-merge-")
            .tempdir_in(&parent)
            .map_err(|source| IndexError::TempDirFailed { parent, source })?;

        debug!(path = %dir.path().display(), "created index directory");
        Ok(Self { dir })
    }

    /// The directory itself
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the index database lives inside the directory
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join(INDEX_FILE_NAME)
    }

    /// Remove the directory and everything in it. Failures are logged only.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            error!(path = %path.display(), "unable to clean up temporary index files: {}", e);
        }
    }
}
