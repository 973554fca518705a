//! SQLite index backend.

use super::DigestIndex;
use crate::core::hasher::ContentDigest;
use crate::error::IndexError;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SQLite-backed digest index
///
/// The store is working state for a single run; durability is traded for
/// speed (no fsync on commit).
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteIndex {
    /// Open or create an index database at the given path
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path).map_err(|e| IndexError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=OFF;")
            .map_err(|e| IndexError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS digests (
                algorithm TEXT NOT NULL,
                digest BLOB NOT NULL,
                source_path TEXT NOT NULL,
                recorded_at INTEGER NOT NULL,
                PRIMARY KEY (algorithm, digest)
            )",
            [],
        )
        .map_err(|e| IndexError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    fn to_timestamp(time: SystemTime) -> i64 {
        time.duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs() as i64
    }
}

impl DigestIndex for SqliteIndex {
    fn get(&self, digest: &ContentDigest) -> Result<Option<PathBuf>, IndexError> {
        let conn = self.conn.lock().map_err(|_| IndexError::Corrupted {
            path: self.db_path.clone(),
        })?;

        let result: Result<String, _> = conn.query_row(
            "SELECT source_path FROM digests WHERE algorithm = ? AND digest = ?",
            params![digest.algorithm().name(), digest.as_bytes().to_vec()],
            |row| row.get(0),
        );

        match result {
            Ok(source) => Ok(Some(PathBuf::from(source))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(IndexError::QueryFailed(e.to_string())),
        }
    }

    fn set(&self, digest: &ContentDigest, source: &Path) -> Result<(), IndexError> {
        let conn = self.conn.lock().map_err(|_| IndexError::Corrupted {
            path: self.db_path.clone(),
        })?;

        conn.execute(
            "INSERT OR IGNORE INTO digests (algorithm, digest, source_path, recorded_at)
             VALUES (?, ?, ?, ?)",
            params![
                digest.algorithm().name(),
                digest.as_bytes().to_vec(),
                source.to_string_lossy(),
                Self::to_timestamp(SystemTime::now()),
            ],
        )
        .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn len(&self) -> Result<usize, IndexError> {
        let conn = self.conn.lock().map_err(|_| IndexError::Corrupted {
            path: self.db_path.clone(),
        })?;

        conn.query_row("SELECT COUNT(*) FROM digests", [], |row| {
            row.get::<_, i64>(0).map(|v| v as usize)
        })
        .map_err(|e| IndexError::QueryFailed(e.to_string()))
    }
}
