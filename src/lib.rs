//! # Dedup Merge
//!
//! Merges one or more source directory trees into a single destination tree,
//! placing each unique file content exactly once.
//!
//! ## Core Philosophy
//! - **Never overwrite** - A name collision is reported, not resolved by clobbering
//! - **First seen wins** - The first file with a given content claims its slot
//! - **Keep going** - One bad file never stops the rest of the merge
//!
//! ## Architecture
//! The library is split into a core engine and presentation layers:
//! - `core` - Walker, fingerprinter, digest index and merge engine
//! - `events` - Event-driven progress reporting
//! - `error` - Error types and process exit codes
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DedupMergeError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG` takes
/// precedence; otherwise `verbose` selects between `debug` and `info`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    // A subscriber may already be installed (e.g. by an embedding application)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
