//! HR Data Cleaning Library
//!
//! Batch cleaning and missing-value imputation for a raw human-resources
//! export, built on Polars.
//!
//! # Overview
//!
//! - **Cleaning**: identifier handling, duplicate removal, uninformative
//!   column pruning, text normalization, strict type coercion and ordinal
//!   relabeling
//! - **Categorical Imputation**: mode when it dominates, a fallback label
//!   otherwise
//! - **Numeric Imputation**: median or k-nearest-neighbor fills chosen by
//!   missingness tier, with optional `<column>_missing` indicators
//! - **Progress Reporting**: per-stage updates through [`ProgressReporter`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hr_cleaning::{CleaningPipeline, PipelineConfig};
//! use hr_cleaning::io::{read_csv, write_csv};
//!
//! let df = read_csv("data/raw_hr.csv")?;
//!
//! let config = PipelineConfig::builder()
//!     .neighbor_count(5)
//!     .categorical_exclude(vec!["attrition".into()])
//!     .build()?;
//!
//! let mut result = CleaningPipeline::builder()
//!     .config(config)
//!     .build()?
//!     .process(df)?;
//!
//! write_csv(&mut result.data, "output/hr_processed.csv")?;
//! ```
//!
//! # Imputers on their own
//!
//! The imputers can be run directly on any DataFrame:
//!
//! ```rust,ignore
//! use hr_cleaning::{ColumnSpec, Imputation, PipelineConfig};
//!
//! let imputation = Imputation::from_config(&PipelineConfig::default());
//! let report = imputation.apply(&mut df, &[
//!     ColumnSpec::categorical("department"),
//!     ColumnSpec::numeric("monthly_income"),
//! ])?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod io;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CoercionReport, DataCleaner};
pub use config::{
    CategoricalImputationConfig, CleaningConfig, ConfigValidationError, NumericImputationConfig,
    PipelineConfig, PipelineConfigBuilder, TargetType,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use imputers::{
    CategoricalImputer, Imputation, KnnImputer, MISSING_INDICATOR_SUFFIX, NumericImputer,
};
pub use pipeline::{
    CleaningPipeline, CleaningPipelineBuilder, ClosureProgressReporter, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use reporting::{CleaningReport, ReportWriter};
pub use types::{
    CategoricalOutcome, CategoricalReport, CategoricalStrategy, CleaningSummary, ColumnKind,
    ColumnSpec, ImputationReport, MissingnessTier, ModeStatistics, NumericOutcome, NumericReport,
    NumericStrategy, PipelineResult,
};
