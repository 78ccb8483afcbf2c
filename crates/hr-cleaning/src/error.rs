//! Custom error types for the cleaning pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Errors are
//! serializable so they can be embedded in JSON summaries next to the
//! cleaned export.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The column's dtype has no categorical or numeric interpretation.
    #[error("Column '{column}' has unsupported dtype {dtype} for imputation")]
    UnsupportedColumnKind { column: String, dtype: String },

    /// Standardization is undefined for a constant or fully missing column.
    #[error("Column '{0}' has zero variance in the numeric context; drop constant columns before imputation")]
    DegenerateVariance(String),

    /// Distance-based imputation found no donor rows.
    #[error("Column '{column}' has {available} donor rows for neighbor imputation (need at least 1)")]
    InsufficientContext { column: String, available: usize },

    /// Type conversion failed.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine-readable summaries.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnsupportedColumnKind { .. } => "UNSUPPORTED_COLUMN_KIND",
            Self::DegenerateVariance(_) => "DEGENERATE_VARIANCE",
            Self::InsufficientContext { .. } => "INSUFFICIENT_CONTEXT",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the error points at pathological input rather than a broken
    /// environment. Such runs must be fixed upstream, never retried.
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::DegenerateVariance(_)
            | Self::InsufficientContext { .. }
            | Self::UnsupportedColumnKind { .. }
            | Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}
