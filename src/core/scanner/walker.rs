//! Directory walking implementation using walkdir.

use super::{WalkSummary, WorkItem};
use crate::error::WalkError;
use crate::events::{Event, EventSender, WalkEvent};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Configuration for the tree walker
#[derive(Debug, Clone, Default)]
pub struct WalkConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Visit each directory's files (by name) before its subdirectories (by
    /// name) instead of using enumeration order.
    ///
    /// Makes "first file with this content wins" deterministic.
    pub sort_entries: bool,
}

/// Walker implementation using the walkdir crate
pub struct TreeWalker {
    config: WalkConfig,
    events: EventSender,
}

/// Map a file found under `root` to its slot under `destination`.
pub fn destination_for(
    root: &Path,
    path: &Path,
    destination: &Path,
) -> Result<PathBuf, WalkError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| WalkError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;
    Ok(destination.join(relative))
}

impl TreeWalker {
    /// Create a new walker reporting through `events`
    pub fn new(config: WalkConfig, events: EventSender) -> Self {
        Self { config, events }
    }

    /// Walk every root in order, sending one [`WorkItem`] per regular file.
    ///
    /// `output` is consumed and dropped on return, which closes the queue
    /// for the next stage. The destination root is never descended into, so
    /// files placed during this run are not picked up again.
    pub fn walk(
        &self,
        roots: &[PathBuf],
        destination: &Path,
        output: Sender<WorkItem>,
    ) -> WalkSummary {
        let mut summary = WalkSummary::default();
        let mut seq = 0u64;
        let destination =
            std::path::absolute(destination).unwrap_or_else(|_| destination.to_path_buf());

        for root in roots {
            let root = match self.prepare_root(root) {
                Ok(root) => root,
                Err(error) => {
                    self.report(error, &mut summary);
                    continue;
                }
            };

            info!(root = %root.display(), "walking source root");
            self.events.send(Event::Walk(WalkEvent::RootStarted { root: root.clone() }));
            summary.roots_walked += 1;

            if !self.walk_root(&root, &destination, &output, &mut seq, &mut summary) {
                warn!("fingerprinter stopped accepting work, ending walk early");
                break;
            }
        }

        self.events.send(Event::Walk(WalkEvent::Completed {
            files_found: summary.files_found,
        }));

        summary
    }

    /// Returns false when the downstream queue has been closed.
    fn walk_root(
        &self,
        root: &Path,
        destination: &Path,
        output: &Sender<WorkItem>,
        seq: &mut u64,
        summary: &mut WalkSummary,
    ) -> bool {
        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);

        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        if self.config.sort_entries {
            walker = walker.sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            });
        }

        let entries = walker.into_iter().filter_entry(|entry| {
            let skip = entry.path() == destination;
            if skip {
                debug!(path = %entry.path().display(), "skipping destination root");
            }
            !skip
        });

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();

                    let error = if e.io_error().map(|e| e.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        WalkError::PermissionDenied { path }
                    } else {
                        WalkError::ReadEntry {
                            path,
                            source: std::io::Error::other(e.to_string()),
                        }
                    };

                    self.report(error, summary);
                    continue;
                }
            };

            // Directories, symlinks and special files are never emitted
            if !entry.file_type().is_file() {
                continue;
            }

            let dest_path = match destination_for(root, entry.path(), destination) {
                Ok(dest_path) => dest_path,
                Err(error) => {
                    self.report(error, summary);
                    continue;
                }
            };

            let item = WorkItem::new(*seq, entry.path().to_path_buf(), dest_path);
            *seq += 1;
            summary.files_found += 1;

            debug!(path = %item.source_path().display(), "found file");
            self.events.send(Event::Walk(WalkEvent::FileFound {
                path: item.source_path().to_path_buf(),
            }));

            if output.send(item).is_err() {
                return false;
            }
        }

        true
    }

    fn prepare_root(&self, root: &Path) -> Result<PathBuf, WalkError> {
        let root = std::path::absolute(root).map_err(|source| WalkError::ReadEntry {
            path: root.to_path_buf(),
            source,
        })?;

        if !root.exists() {
            return Err(WalkError::RootNotFound { path: root });
        }

        if !root.is_dir() {
            return Err(WalkError::NotADirectory { path: root });
        }

        Ok(root)
    }

    fn report(&self, error: WalkError, summary: &mut WalkSummary) {
        let path = match &error {
            WalkError::RootNotFound { path }
            | WalkError::NotADirectory { path }
            | WalkError::PermissionDenied { path }
            | WalkError::ReadEntry { path, .. }
            | WalkError::OutsideRoot { path, .. } => path.clone(),
        };

        warn!(path = %path.display(), "{}", error);
        self.events.send(Event::Walk(WalkEvent::Error {
            path,
            message: error.to_string(),
        }));

        summary.errors.push(error);
    }
}
