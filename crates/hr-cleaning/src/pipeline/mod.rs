//! Pipeline module.
//!
//! This module provides the end-to-end cleaning pipeline and its progress
//! reporting.

mod builder;
pub mod progress;

pub use builder::{CleaningPipeline, CleaningPipelineBuilder};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
