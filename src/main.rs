//! # dedup-merge CLI
//!
//! Merges source directory trees into one destination, skipping content
//! that has already been placed.
//!
//! ## Usage
//! ```bash
//! dedup-merge /merged /backups/laptop /backups/phone
//! dedup-merge --move --sorted /merged /dumps/2019 /dumps/2020
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
