//! Copy and move execution.

use super::{MoveFallback, TransferMethod, TransferMode, TransferOutcome};
use crate::error::TransferError;
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, error, warn};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

/// Permissions for placed files (before umask)
#[cfg(unix)]
const FILE_MODE: u32 = 0o640;
/// Permissions for created destination directories (before umask)
#[cfg(unix)]
const DIR_MODE: u32 = 0o750;

/// Signature of the rename primitive used for moves
pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

/// A writer that can wait for its data to reach storage.
trait SyncWrite: Write {
    fn sync(&mut self) -> io::Result<()>;
}

impl SyncWrite for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Copy every byte and only report success once the data is on disk.
///
/// Write errors that a filesystem defers until close (quota, NFS, delayed
/// allocation) surface here instead of being lost when the file is dropped.
fn stream_to<R: Read, W: SyncWrite>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let bytes = io::copy(reader, writer)?;
    writer.flush()?;
    writer.sync()?;
    Ok(bytes)
}

fn std_rename(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

/// Create the destination's parent directories if needed
fn ensure_parent(dest: &Path) -> Result<(), TransferError> {
    if let Some(parent) = dest.parent() {
        let mut builder = DirBuilder::new();
        // Recursive creation succeeds if the directory already exists
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(DIR_MODE);

        builder
            .create(parent)
            .map_err(|source| TransferError::CreateParent {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}

/// Copy `source` to `dest`, refusing to overwrite an existing file.
///
/// Missing parent directories are created. If the byte stream or the final
/// sync fails, the partial destination is removed. Returns bytes copied.
pub fn copy_exclusive(source: &Path, dest: &Path) -> Result<u64, TransferError> {
    let mut reader = File::open(source).map_err(|e| TransferError::OpenSource {
        path: source.to_path_buf(),
        source: e,
    })?;

    ensure_parent(dest)?;

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);

    let mut writer = options
        .open(dest)
        .map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                TransferError::DestinationExists {
                    path: dest.to_path_buf(),
                }
            } else {
                TransferError::CreateDestination {
                    path: dest.to_path_buf(),
                    source: e,
                }
            }
        })?;

    match stream_to(&mut reader, &mut writer) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            drop(writer);
            if let Err(remove_err) = fs::remove_file(dest) {
                error!(path = %dest.display(), "unable to remove partial copy: {}", remove_err);
            }
            Err(TransferError::Copy {
                from: source.to_path_buf(),
                to: dest.to_path_buf(),
                source: e,
            })
        }
    }
}

/// Places files at their destination using the configured mode
#[derive(Debug, Clone, Copy)]
pub struct Transferer {
    mode: TransferMode,
    fallback: MoveFallback,
    rename: RenameFn,
}

impl Transferer {
    /// Create a transferer for `mode` with the default move fallback
    pub fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            fallback: MoveFallback::default(),
            rename: std_rename,
        }
    }

    /// Choose what happens to the source after a fallback copy
    pub fn with_fallback(mut self, fallback: MoveFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replace the rename primitive (used to exercise the fallback path)
    pub fn with_rename(mut self, rename: RenameFn) -> Self {
        self.rename = rename;
        self
    }

    /// Transfer one file
    pub fn transfer(&self, source: &Path, dest: &Path) -> Result<TransferOutcome, TransferError> {
        match self.mode {
            TransferMode::Copy => {
                debug!(from = %source.display(), to = %dest.display(), "copying file");
                let bytes = copy_exclusive(source, dest)?;
                Ok(TransferOutcome {
                    method: TransferMethod::Copied,
                    bytes,
                })
            }
            TransferMode::Move => self.move_file(source, dest),
        }
    }

    fn move_file(&self, source: &Path, dest: &Path) -> Result<TransferOutcome, TransferError> {
        debug!(from = %source.display(), to = %dest.display(), "moving file");

        let source_size = fs::metadata(source)
            .map_err(|e| TransferError::OpenSource {
                path: source.to_path_buf(),
                source: e,
            })?
            .len();

        ensure_parent(dest)?;

        // rename() would silently replace an existing file
        if fs::symlink_metadata(dest).is_ok() {
            return Err(TransferError::DestinationExists {
                path: dest.to_path_buf(),
            });
        }

        match (self.rename)(source, dest) {
            Ok(()) => Ok(TransferOutcome {
                method: TransferMethod::Renamed,
                bytes: source_size,
            }),
            Err(e) => {
                warn!(
                    from = %source.display(),
                    to = %dest.display(),
                    "renaming failed ({}), trying to copy instead",
                    e
                );
                let bytes = copy_exclusive(source, dest)?;
                let source_removed = self.finish_fallback(source, source_size, bytes);
                Ok(TransferOutcome {
                    method: TransferMethod::CopiedAfterRenameFailed { source_removed },
                    bytes,
                })
            }
        }
    }

    /// Returns whether the source was removed.
    fn finish_fallback(&self, source: &Path, source_size: u64, copied: u64) -> bool {
        if self.fallback == MoveFallback::KeepSource {
            return false;
        }

        if copied != source_size {
            warn!(
                path = %source.display(),
                "copied {} bytes but source had {}, keeping source",
                copied,
                source_size
            );
            return false;
        }

        match fs::remove_file(source) {
            Ok(()) => true,
            Err(e) => {
                error!(path = %source.display(), "unable to remove source after copy: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn failing_rename(_: &Path, _: &Path) -> io::Result<()> {
        Err(io::Error::other("cross-device link"))
    }

    fn source_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn copy_creates_parents_and_keeps_source() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "hello");
        let dest = dst.path().join("2024/01/a.txt");

        let outcome = Transferer::new(TransferMode::Copy)
            .transfer(&source, &dest)
            .unwrap();

        assert_eq!(outcome.method, TransferMethod::Copied);
        assert_eq!(outcome.bytes, 5);
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
        assert_eq!(fs::read_to_string(&source).unwrap(), "hello");
    }

    #[test]
    fn copy_refuses_existing_destination() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "new");
        let dest = dst.path().join("a.txt");
        fs::write(&dest, "original").unwrap();

        let result = copy_exclusive(&source, &dest);

        assert!(matches!(result, Err(TransferError::DestinationExists { .. })));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "original");
    }

    #[test]
    fn copy_missing_source_creates_nothing() {
        let dst = TempDir::new().unwrap();
        let dest = dst.path().join("sub/a.txt");

        let result = copy_exclusive(Path::new("/nonexistent/a.txt"), &dest);

        assert!(matches!(result, Err(TransferError::OpenSource { .. })));
        assert!(!dest.exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_stream_removes_partial_destination() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        // Opening a directory succeeds on Linux but reading from it fails
        let dest = dst.path().join("partial.bin");

        let result = copy_exclusive(src.path(), &dest);

        assert!(matches!(result, Err(TransferError::Copy { .. })));
        assert!(!dest.exists());
    }

    /// Accepts every write, then fails when asked to sync
    struct DeferredFailure(Vec<u8>);

    impl Write for DeferredFailure {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SyncWrite for DeferredFailure {
        fn sync(&mut self) -> io::Result<()> {
            Err(io::Error::other("no space left on device"))
        }
    }

    #[test]
    fn sync_failure_after_full_write_is_an_error() {
        let mut writer = DeferredFailure(Vec::new());

        let result = stream_to(&mut &b"hello"[..], &mut writer);

        assert_eq!(writer.0, b"hello");
        assert_eq!(result.unwrap_err().to_string(), "no space left on device");
    }

    #[test]
    fn stream_to_file_reports_bytes_after_sync() {
        let dst = TempDir::new().unwrap();
        let path = dst.path().join("synced.bin");
        let mut file = File::create(&path).unwrap();

        let bytes = stream_to(&mut &b"payload"[..], &mut file).unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(fs::read(&path).unwrap(), b"payload");
    }

    #[cfg(unix)]
    #[test]
    fn copy_keeps_placed_files_private_to_owner_and_group() {
        use std::os::unix::fs::PermissionsExt;

        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "hello");
        let dest = dst.path().join("2024/a.txt");

        copy_exclusive(&source, &dest).unwrap();

        let file_mode = fs::metadata(&dest).unwrap().permissions().mode();
        let dir_mode = fs::metadata(dst.path().join("2024")).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777 & !FILE_MODE, 0);
        assert_eq!(dir_mode & 0o777 & !DIR_MODE, 0);
    }

    #[test]
    fn move_renames_and_removes_source() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "hello");
        let dest = dst.path().join("nested/a.txt");

        let outcome = Transferer::new(TransferMode::Move)
            .transfer(&source, &dest)
            .unwrap();

        assert_eq!(outcome.method, TransferMethod::Renamed);
        assert_eq!(outcome.bytes, 5);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn move_never_replaces_existing_destination() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "new");
        let dest = dst.path().join("a.txt");
        fs::write(&dest, "original").unwrap();

        let result = Transferer::new(TransferMode::Move).transfer(&source, &dest);

        assert!(matches!(result, Err(TransferError::DestinationExists { .. })));
        assert_eq!(fs::read_to_string(&dest).unwrap(), "original");
        assert!(source.exists());
    }

    #[test]
    fn move_fallback_keeps_source_by_default() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "hello");
        let dest = dst.path().join("a.txt");

        let outcome = Transferer::new(TransferMode::Move)
            .with_rename(failing_rename)
            .transfer(&source, &dest)
            .unwrap();

        assert_eq!(
            outcome.method,
            TransferMethod::CopiedAfterRenameFailed {
                source_removed: false
            }
        );
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn move_fallback_can_remove_source() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        let source = source_file(&src, "a.txt", "hello");
        let dest = dst.path().join("a.txt");

        let outcome = Transferer::new(TransferMode::Move)
            .with_fallback(MoveFallback::RemoveSource)
            .with_rename(failing_rename)
            .transfer(&source, &dest)
            .unwrap();

        assert_eq!(
            outcome.method,
            TransferMethod::CopiedAfterRenameFailed {
                source_removed: true
            }
        );
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }
}
