//! # Index Module
//!
//! Remembers which content digests have already been placed in the
//! destination during the current run.
//!
//! Only key presence matters for dedup decisions; the stored source path is
//! informational. The index is append-only and lives only as long as the run.
//!
//! ## Backends
//! - `SqliteIndex` - On-disk store inside a throwaway `IndexDir`
//! - `InMemoryIndex` - For testing

mod memory;
mod sqlite;
mod temp_dir;
mod traits;

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;
pub use temp_dir::IndexDir;
pub use traits::DigestIndex;
