use crate::error::{CleaningError, Result};
use crate::utils::{is_numeric_dtype, is_text_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Column Kinds
// ============================================================================

/// Declared semantic kind of a column handed to the imputers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Discrete labels, filled by mode or fallback label.
    Categorical,
    /// Real or integer quantities, filled by median or neighbors.
    Numeric,
}

impl ColumnKind {
    /// Derive the kind from a polars dtype.
    ///
    /// Text and categorical dtypes map to [`ColumnKind::Categorical`],
    /// integer and float dtypes to [`ColumnKind::Numeric`]. Anything else is
    /// rejected instead of being silently skipped.
    pub fn from_dtype(column: &str, dtype: &DataType) -> Result<Self> {
        if is_numeric_dtype(dtype) {
            Ok(Self::Numeric)
        } else if is_text_dtype(dtype) {
            Ok(Self::Categorical)
        } else {
            Err(CleaningError::UnsupportedColumnKind {
                column: column.to_string(),
                dtype: dtype.to_string(),
            })
        }
    }
}

/// A column name paired with its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Categorical,
        }
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Numeric,
        }
    }

    /// Declare every text or numeric column of `df`, in column order.
    /// Columns of any other dtype produce an error.
    pub fn infer_all(df: &DataFrame) -> Result<Vec<Self>> {
        df.get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                let kind = ColumnKind::from_dtype(&name, col.dtype())?;
                Ok(Self { name, kind })
            })
            .collect()
    }
}

// ============================================================================
// Categorical Imputation Outcomes
// ============================================================================

/// Which rule filled a categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CategoricalStrategy {
    /// Missing cells received the dominant value.
    Mode { value: String },
    /// Missing ratio above the high threshold.
    FallbackHighMissing,
    /// No present values to rank.
    FallbackNoValues,
    /// Mode too rare or too close to the runner-up.
    FallbackWeakMode,
    /// Column absent from the dataset; nothing was touched.
    NotFound,
}

impl fmt::Display for CategoricalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mode { value } => write!(f, "mode '{}'", value),
            Self::FallbackHighMissing => write!(f, "fallback label (high missingness)"),
            Self::FallbackNoValues => write!(f, "fallback label (no present values)"),
            Self::FallbackWeakMode => write!(f, "fallback label (weak mode)"),
            Self::NotFound => write!(f, "skipped (column not found)"),
        }
    }
}

/// Frequency statistics of the two leading values of a categorical column.
/// Shares are relative to the total row count, not the present count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeStatistics {
    pub top_value: String,
    pub top_share: f64,
    pub second_value: Option<String>,
    pub second_share: f64,
    pub margin: f64,
    /// The mode-share threshold that applied to this column.
    pub required_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalOutcome {
    pub column: String,
    pub strategy: CategoricalStrategy,
    pub total_rows: usize,
    pub missing_count: usize,
    pub missing_ratio: f64,
    /// Number of cells written.
    pub filled: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_statistics: Option<ModeStatistics>,
}

impl CategoricalOutcome {
    pub(crate) fn not_found(column: &str) -> Self {
        Self {
            column: column.to_string(),
            strategy: CategoricalStrategy::NotFound,
            total_rows: 0,
            missing_count: 0,
            missing_ratio: 0.0,
            filled: 0,
            mode_statistics: None,
        }
    }
}

/// Per-column account of a categorical imputation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalReport {
    pub outcomes: Vec<CategoricalOutcome>,
}

impl CategoricalReport {
    pub fn outcome(&self, column: &str) -> Option<&CategoricalOutcome> {
        self.outcomes.iter().find(|o| o.column == column)
    }

    /// Columns that were requested but not present.
    pub fn skipped(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.strategy == CategoricalStrategy::NotFound)
            .map(|o| o.column.as_str())
            .collect()
    }

    pub fn total_filled(&self) -> usize {
        self.outcomes.iter().map(|o| o.filled).sum()
    }
}

// ============================================================================
// Numeric Imputation Outcomes
// ============================================================================

/// Missingness band a numeric column fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingnessTier {
    /// At or below the low threshold.
    Low,
    /// Above the low threshold, at or below the high threshold.
    Moderate,
    /// Above the high threshold.
    High,
}

/// Which rule filled a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum NumericStrategy {
    /// Nothing to fill.
    Complete,
    /// Filled with the column's own median.
    Median { value: f64 },
    /// Filled by distance-weighted nearest-neighbor imputation.
    Neighbors { neighbors: usize },
    /// No present value to compute a median from; left as is.
    Unfilled,
    /// Column absent from the dataset.
    NotFound,
    /// Column present but not numeric.
    NotNumeric,
}

impl fmt::Display for NumericStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete (nothing to fill)"),
            Self::Median { value } => write!(f, "median {:.2}", value),
            Self::Neighbors { neighbors } => write!(f, "nearest neighbors (k={})", neighbors),
            Self::Unfilled => write!(f, "left unfilled (no present values)"),
            Self::NotFound => write!(f, "skipped (column not found)"),
            Self::NotNumeric => write!(f, "skipped (not numeric)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericOutcome {
    pub column: String,
    pub strategy: NumericStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<MissingnessTier>,
    pub missing_count: usize,
    pub missing_ratio: f64,
    /// Number of cells written.
    pub filled: usize,
    /// Name of the indicator column created for this column, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator: Option<String>,
    /// Whether the column was rounded back to integers after filling.
    pub restored_integer: bool,
}

impl NumericOutcome {
    pub(crate) fn skipped(column: &str, strategy: NumericStrategy) -> Self {
        Self {
            column: column.to_string(),
            strategy,
            tier: None,
            missing_count: 0,
            missing_ratio: 0.0,
            filled: 0,
            indicator: None,
            restored_integer: false,
        }
    }

    /// Whether this column was eligible for numeric imputation.
    pub fn is_eligible(&self) -> bool {
        !matches!(
            self.strategy,
            NumericStrategy::NotFound | NumericStrategy::NotNumeric
        )
    }
}

/// Per-column account of a numeric imputation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericReport {
    pub outcomes: Vec<NumericOutcome>,
    /// Numeric columns used as neighbor context, fixed at call start.
    pub context_columns: Vec<String>,
}

impl NumericReport {
    pub fn outcome(&self, column: &str) -> Option<&NumericOutcome> {
        self.outcomes.iter().find(|o| o.column == column)
    }

    pub fn eligible_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_eligible()).count()
    }

    /// Indicator columns created during the call, in creation order.
    pub fn indicators(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.indicator.as_deref())
            .collect()
    }

    pub fn total_filled(&self) -> usize {
        self.outcomes.iter().map(|o| o.filled).sum()
    }
}

/// Combined account of a categorical-then-numeric imputation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    pub categorical: CategoricalReport,
    pub numeric: NumericReport,
}

// ============================================================================
// Pipeline Results
// ============================================================================

/// Serializable summary of a pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    /// Human-readable account of the cleaning stages, in execution order.
    pub cleaning_actions: Vec<String>,

    pub imputation: ImputationReport,

    /// Missing cells left in the columns handed to the categorical imputer.
    pub remaining_missing_categorical: usize,
    /// Missing cells left in the columns handed to the numeric imputer.
    pub remaining_missing_numeric: usize,

    pub warnings: Vec<String>,
}

impl CleaningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: impl Into<String>) {
        self.cleaning_actions.push(action.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Output of [`crate::CleaningPipeline::process`].
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The cleaned and imputed table.
    pub data: DataFrame,
    pub summary: CleaningSummary,
}
