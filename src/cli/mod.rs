//! # CLI Module
//!
//! Command-line interface for the merge pipeline.
//!
//! ## Usage
//! ```bash
//! # Copy everything unique from two backups into /merged
//! dedup-merge /merged /backups/a /backups/b
//!
//! # Move instead of copy, deterministic winner selection
//! dedup-merge -m --sorted /merged /backups/a /backups/b
//!
//! # JSON summary
//! dedup-merge /merged /backups/a --output json
//! ```
//!
//! ## Exit Status
//! - `0` - the pipeline drained (individual files may still have failed)
//! - `1` - invalid parameters
//! - `2` - the temporary index directory could not be created
//! - `4` - the index could not be opened

use clap::{Parser, ValueEnum};
use console::{style, Term};
use dedup_merge::core::hasher::DigestAlgorithm;
use dedup_merge::core::pipeline::{Pipeline, PipelineResult};
use dedup_merge::core::transfer::{MoveFallback, TransferMode};
use dedup_merge::error::EXIT_INVALID_PARAMS;
use dedup_merge::events::{Event, EventChannel, MergeEvent, PipelineEvent, WalkEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

/// Merge directory trees, placing each unique file content exactly once
#[derive(Parser, Debug)]
#[command(name = "dedup-merge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Move files to destination instead of copying
    #[arg(short = 'm', long = "move")]
    move_files: bool,

    /// Destination directory
    destination: PathBuf,

    /// Source directories, merged in the order given
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Digest algorithm used to detect identical content
    #[arg(short, long, default_value = "sha256")]
    algorithm: Algorithm,

    /// Number of hashing workers
    #[arg(long, default_value = "1")]
    hash_workers: usize,

    /// Visit files before subdirectories, each in name order (deterministic winners)
    #[arg(long)]
    sorted: bool,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_symlinks: bool,

    /// Descend at most this many directory levels below each source
    #[arg(long)]
    max_depth: Option<usize>,

    /// With --move: delete the source when a rename had to fall back to a copy
    #[arg(long, requires = "move_files")]
    remove_after_copy: bool,

    /// Directory to create the temporary index in
    #[arg(long)]
    index_dir: Option<PathBuf>,

    /// Summary output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// SHA-256 (default)
    Sha256,
    /// BLAKE3, faster on large files
    Blake3,
}

impl From<Algorithm> for DigestAlgorithm {
    fn from(algo: Algorithm) -> Self {
        match algo {
            Algorithm::Sha256 => DigestAlgorithm::Sha256,
            Algorithm::Blake3 => DigestAlgorithm::Blake3,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Progress spinner and human-readable summary
    Pretty,
    /// JSON summary for scripting
    Json,
    /// Nothing but log output
    Quiet,
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_error_code(&e));
        }
    };

    dedup_merge::init_tracing(cli.verbose);

    let mode = if cli.move_files {
        TransferMode::Move
    } else {
        TransferMode::Copy
    };
    let fallback = if cli.remove_after_copy {
        MoveFallback::RemoveSource
    } else {
        MoveFallback::KeepSource
    };

    let mut builder = Pipeline::builder()
        .sources(cli.sources.clone())
        .destination(cli.destination.clone())
        .mode(mode)
        .move_fallback(fallback)
        .algorithm(cli.algorithm.into())
        .hash_workers(cli.hash_workers)
        .sort_entries(cli.sorted)
        .follow_symlinks(cli.follow_symlinks)
        .max_depth(cli.max_depth);

    if let Some(ref dir) = cli.index_dir {
        builder = builder.index_parent(dir.clone());
    }

    let pipeline = builder.build();

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(cli.output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let mut found = 0usize;
        let mut placed = 0usize;
        let mut duplicates = 0usize;

        for event in receiver.iter() {
            match event {
                Event::Walk(WalkEvent::FileFound { .. }) => found += 1,
                Event::Merge(MergeEvent::Transferred { .. }) => placed += 1,
                Event::Merge(MergeEvent::DuplicateSkipped { .. }) => duplicates += 1,
                Event::Pipeline(PipelineEvent::Completed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.finish_and_clear();
                    }
                    continue;
                }
                _ => continue,
            }

            if let Some(ref pb) = progress_clone {
                pb.set_message(format!(
                    "{} found, {} placed, {} duplicates",
                    found, placed, duplicates
                ));
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    match result {
        Ok(result) => {
            match cli.output {
                OutputFormat::Pretty => print_pretty_results(&Term::stderr(), &result),
                OutputFormat::Json => print_json_results(&result),
                OutputFormat::Quiet => {}
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Exit status for a failed argument parse. `--help` and `--version` are
/// reported through the same path but are not errors.
fn parse_error_code(error: &clap::Error) -> u8 {
    if error.use_stderr() {
        EXIT_INVALID_PARAMS
    } else {
        0
    }
}

fn print_pretty_results(term: &Term, result: &PipelineResult) {
    let summary = result.summary();

    term.write_line(&format!("{} Merge Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files found in {:.1}s",
        style(summary.files_found).cyan(),
        summary.duration_ms as f64 / 1000.0
    ))
    .ok();

    term.write_line(&format!(
        "  {} files placed ({})",
        style(summary.transferred).cyan(),
        style(format_bytes(summary.bytes_transferred)).yellow()
    ))
    .ok();

    term.write_line(&format!(
        "  {} duplicates skipped",
        style(summary.duplicates).cyan()
    ))
    .ok();

    if result.report.fallback_copies > 0 {
        term.write_line(&format!(
            "  {} moves fell back to copying",
            style(result.report.fallback_copies).dim()
        ))
        .ok();
    }

    if summary.failures > 0 {
        term.write_line(&format!(
            "  {} files could not be merged (see log)",
            style(summary.failures).red()
        ))
        .ok();
    }
}

fn print_json_results(result: &PipelineResult) {
    let output = serde_json::json!({
        "summary": result.summary(),
        "report": result.report,
        "walk_errors": result.walk_errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("unable to serialize summary: {}", e),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
