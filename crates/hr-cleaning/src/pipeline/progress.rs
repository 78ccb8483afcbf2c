//! Progress reporting for the cleaning pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use hr_cleaning::CleaningPipeline;
//!
//! let result = CleaningPipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Setting the identifier column aside
    Initializing,
    /// Removing duplicate rows
    Deduplication,
    /// Dropping constant and near-unique columns
    ColumnPruning,
    /// Trimming text and nulling missing markers
    TextNormalization,
    /// Applying per-column type coercions
    TypeCoercion,
    /// Replacing ordinal codes with labels
    OrdinalMapping,
    /// Filling categorical columns
    CategoricalImputation,
    /// Filling numeric columns
    NumericImputation,
    /// Reattaching the identifier and summarizing
    Finalizing,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Deduplication => "Removing Duplicates",
            Self::ColumnPruning => "Pruning Columns",
            Self::TextNormalization => "Normalizing Text",
            Self::TypeCoercion => "Coercing Types",
            Self::OrdinalMapping => "Mapping Ordinals",
            Self::CategoricalImputation => "Imputing Categorical Values",
            Self::NumericImputation => "Imputing Numeric Values",
            Self::Finalizing => "Finalizing",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run attributed to this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::Deduplication => 0.08,
            Self::ColumnPruning => 0.05,
            Self::TextNormalization => 0.10,
            Self::TypeCoercion => 0.10,
            Self::OrdinalMapping => 0.05,
            Self::CategoricalImputation => 0.20,
            Self::NumericImputation => 0.35,
            Self::Finalizing => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Deduplication => 0.02,
            Self::ColumnPruning => 0.10,
            Self::TextNormalization => 0.15,
            Self::TypeCoercion => 0.25,
            Self::OrdinalMapping => 0.35,
            Self::CategoricalImputation => 0.40,
            Self::NumericImputation => 0.60,
            Self::Finalizing => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates from the pipeline.
pub trait ProgressReporter: Send + Sync {
    /// Called at the start and end of every stage. Implementations should
    /// return quickly.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
