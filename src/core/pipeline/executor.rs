//! Pipeline execution implementation.

use crate::core::hasher::{ContentHasher, DigestAlgorithm, Fingerprinted, Fingerprinter};
use crate::core::index::{DigestIndex, IndexDir, SqliteIndex};
use crate::core::merge::{MergeEngine, MergeReport};
use crate::core::scanner::{TreeWalker, WalkConfig, WorkItem};
use crate::core::transfer::{MoveFallback, RenameFn, TransferMode, Transferer};
use crate::error::{DedupMergeError, IndexError, WalkError};
use crate::events::{null_sender, Event, EventSender, MergeSummary, PipelineEvent};
use crossbeam_channel::bounded;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use tracing::info;

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// Regular files found by the walker
    pub files_found: usize,
    /// Errors that occurred during walking (non-fatal)
    pub walk_errors: Vec<WalkError>,
    /// What the merge engine did
    pub report: MergeReport,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Flat summary suitable for display or serialization
    pub fn summary(&self) -> MergeSummary {
        MergeSummary {
            files_found: self.files_found,
            transferred: self.report.transferred,
            duplicates: self.report.duplicates,
            failures: self.report.failures() + self.walk_errors.len(),
            bytes_transferred: self.report.bytes_transferred,
            duration_ms: self.duration_ms,
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source roots, walked in order
    pub sources: Vec<PathBuf>,
    /// Destination root
    pub destination: PathBuf,
    /// Copy or move
    pub mode: TransferMode,
    /// Source handling when a move falls back to copying
    pub move_fallback: MoveFallback,
    /// Content digest algorithm
    pub algorithm: DigestAlgorithm,
    /// Number of fingerprinting workers
    pub hash_workers: usize,
    /// Walker configuration
    pub walk: WalkConfig,
    /// Where to create the temporary index directory (None = system temp dir)
    pub index_parent: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            destination: PathBuf::new(),
            mode: TransferMode::Copy,
            move_fallback: MoveFallback::KeepSource,
            algorithm: DigestAlgorithm::Sha256,
            hash_workers: 1,
            walk: WalkConfig::default(),
            index_parent: None,
        }
    }
}

impl PipelineConfig {
    /// Check the configuration before anything is touched
    pub fn validate(&self) -> crate::Result<()> {
        if self.sources.is_empty() {
            return Err(DedupMergeError::Config(
                "at least one source directory is required".to_string(),
            ));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(DedupMergeError::Config(
                "a destination directory is required".to_string(),
            ));
        }
        if self.hash_workers == 0 {
            return Err(DedupMergeError::Config(
                "at least one hash worker is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for pipeline configuration
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    index: Option<Box<dyn DigestIndex>>,
    rename: Option<RenameFn>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source roots
    pub fn sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.config.sources = sources;
        self
    }

    /// Set the destination root
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    /// Copy or move
    pub fn mode(mut self, mode: TransferMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Source handling when a move falls back to copying
    pub fn move_fallback(mut self, fallback: MoveFallback) -> Self {
        self.config.move_fallback = fallback;
        self
    }

    /// Set the digest algorithm
    pub fn algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Set the number of fingerprinting workers
    pub fn hash_workers(mut self, workers: usize) -> Self {
        self.config.hash_workers = workers;
        self
    }

    /// Limit how deep below each source root the walk descends
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.walk.max_depth = depth;
        self
    }

    /// Visit entries in file-name order
    pub fn sort_entries(mut self, sort: bool) -> Self {
        self.config.walk.sort_entries = sort;
        self
    }

    /// Follow symbolic links while walking
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.walk.follow_symlinks = follow;
        self
    }

    /// Create the temporary index directory under `parent`
    pub fn index_parent(mut self, parent: impl Into<PathBuf>) -> Self {
        self.config.index_parent = Some(parent.into());
        self
    }

    /// Use this index instead of a temporary on-disk one
    pub fn index(mut self, index: Box<dyn DigestIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Replace the rename primitive used by move mode
    pub fn rename_with(mut self, rename: RenameFn) -> Self {
        self.rename = Some(rename);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            index: self.index,
            rename: self.rename,
        }
    }
}

/// The merge pipeline
pub struct Pipeline {
    config: PipelineConfig,
    index: Option<Box<dyn DigestIndex>>,
    rename: Option<RenameFn>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(self) -> crate::Result<PipelineResult> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// Fails only if the configuration is invalid or the index can't be set
    /// up; in both cases no file has been touched. Per-file problems are
    /// logged, reported as events and counted in the result.
    pub fn run_with_events(self, events: &EventSender) -> crate::Result<PipelineResult> {
        self.config.validate()?;
        let start_time = Instant::now();

        let Pipeline {
            config,
            index,
            rename,
        } = self;

        let (index, index_dir) = match index {
            Some(index) => (index, None),
            None => open_temporary_index(config.index_parent.as_deref())?,
        };

        info!(
            sources = config.sources.len(),
            destination = %config.destination.display(),
            mode = ?config.mode,
            algorithm = %config.algorithm,
            "starting merge"
        );
        events.send(Event::Pipeline(PipelineEvent::Started));

        let mut transferer = Transferer::new(config.mode).with_fallback(config.move_fallback);
        if let Some(rename) = rename {
            transferer = transferer.with_rename(rename);
        }

        let engine = MergeEngine::new(index, transferer, events.clone());
        let hasher = ContentHasher::new(config.algorithm);
        let walker = TreeWalker::new(config.walk.clone(), events.clone());

        let (work_tx, work_rx) = bounded::<WorkItem>(0);
        let (hashed_tx, hashed_rx) = bounded::<Fingerprinted>(0);

        let (walk_summary, report) = thread::scope(|scope| {
            for _ in 0..config.hash_workers {
                let input = work_rx.clone();
                let output = hashed_tx.clone();
                let fingerprinter = Fingerprinter::new(hasher, events.clone());
                scope.spawn(move || fingerprinter.run(input, output));
            }
            // Only the workers hold these now; their exit closes the queues
            drop(work_rx);
            drop(hashed_tx);

            let merger = scope.spawn(move || {
                let mut engine = engine;
                engine.run(hashed_rx);
                engine.into_report()
            });

            let walk_summary = walker.walk(&config.sources, &config.destination, work_tx);
            let report = merger
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

            (walk_summary, report)
        });

        if let Some(dir) = index_dir {
            dir.cleanup();
        }

        let result = PipelineResult {
            files_found: walk_summary.files_found,
            walk_errors: walk_summary.errors,
            report,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        let summary = result.summary();
        info!(
            files = summary.files_found,
            transferred = summary.transferred,
            duplicates = summary.duplicates,
            failures = summary.failures,
            "merge complete"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed { summary }));

        Ok(result)
    }
}

type OpenIndexFn = fn(&Path) -> Result<Box<dyn DigestIndex>, IndexError>;

fn open_sqlite(path: &Path) -> Result<Box<dyn DigestIndex>, IndexError> {
    Ok(Box::new(SqliteIndex::open(path)?))
}

fn open_temporary_index(
    parent: Option<&Path>,
) -> Result<(Box<dyn DigestIndex>, Option<IndexDir>), IndexError> {
    open_temporary_index_with(parent, open_sqlite)
}

fn open_temporary_index_with(
    parent: Option<&Path>,
    open: OpenIndexFn,
) -> Result<(Box<dyn DigestIndex>, Option<IndexDir>), IndexError> {
    let dir = IndexDir::provision(parent)?;

    match open(&dir.db_path()) {
        Ok(index) => Ok((index, Some(dir))),
        Err(e) => {
            dir.cleanup();
            Err(e)
        }
    }
}
