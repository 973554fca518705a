//! # Pipeline Module
//!
//! Orchestrates a full merge.
//!
//! ## Pipeline Stages
//! 1. **Walk** - Enumerate regular files under each source root (calling thread)
//! 2. **Fingerprint** - Hash each file's content (one or more workers)
//! 3. **Merge** - Place new content, skip duplicates (single worker)
//!
//! Stages hand items over through zero-capacity channels, so a stage can
//! never run more than one item ahead of the next.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
