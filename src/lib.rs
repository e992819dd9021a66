// src/lib.rs
// Public library surface for integration tests (and the updater binary).

pub mod config;
pub mod document;
pub mod pipeline;
pub mod publish;
pub mod review;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::pipeline::{GenerationResult, Pipeline, PipelineError, RunOutcome};
pub use crate::sources::types::{Candidate, SourceItem};
