//! # Core Module
//!
//! The merge engine, independent of any UI.
//!
//! ## Modules
//! - `scanner` - Walks source roots and emits work items
//! - `hasher` - Fingerprints file content
//! - `index` - Remembers which digests were already placed
//! - `transfer` - Copies or moves a file into its destination slot
//! - `merge` - Applies the dedup rule to fingerprinted items
//! - `pipeline` - Wires the stages together with hand-off queues

pub mod hasher;
pub mod index;
pub mod merge;
pub mod pipeline;
pub mod scanner;
pub mod transfer;

// Re-export commonly used types
pub use hasher::{ContentDigest, DigestAlgorithm, FingerprintedItem};
pub use merge::{MergeEngine, MergeReport};
pub use pipeline::{Pipeline, PipelineResult};
pub use scanner::WorkItem;
pub use transfer::{MoveFallback, TransferMode};
