//! Tiered imputation for numeric columns.
//!
//! Each column is routed by its missing ratio: the median for low
//! missingness, nearest neighbors for moderate missingness, and for high
//! missingness an optional `<column>_missing` indicator followed by a median
//! (or, on request, neighbor) fill.

use crate::config::NumericImputationConfig;
use crate::error::Result;
use crate::imputers::knn::KnnImputer;
use crate::imputers::stats::missing_ratio;
use crate::types::{MissingnessTier, NumericOutcome, NumericReport, NumericStrategy};
use crate::utils::{column_names, is_integer_dtype, is_numeric_dtype, numeric_values};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Suffix of the indicator column created for highly incomplete columns.
pub const MISSING_INDICATOR_SUFFIX: &str = "_missing";

/// Fills missing cells of numeric columns by median or nearest neighbors.
#[derive(Debug, Clone, Default)]
pub struct NumericImputer {
    config: NumericImputationConfig,
}

impl NumericImputer {
    pub fn new(config: NumericImputationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NumericImputationConfig {
        &self.config
    }

    /// Fill the missing cells of the named numeric columns.
    ///
    /// The neighbor context is every numeric column present when the call
    /// starts; indicator columns added along the way are not part of it.
    /// Columns are processed in the given order against the current state of
    /// the frame, so a column filled earlier is complete context for the
    /// ones after it. Integer columns are filled as `Float64` during the
    /// pass and only rounded back to their original dtype once every column
    /// is done.
    ///
    /// # Errors
    ///
    /// Neighbor imputation fails with `DegenerateVariance` when a context
    /// column is constant or fully missing.
    pub fn impute<S: AsRef<str>>(
        &self,
        df: &mut DataFrame,
        columns: &[S],
    ) -> Result<NumericReport> {
        let context: Vec<String> = column_names(df)
            .into_iter()
            .filter(|name| {
                df.column(name)
                    .map(|c| is_numeric_dtype(c.dtype()))
                    .unwrap_or(false)
            })
            .collect();

        let mut report = NumericReport {
            outcomes: Vec::with_capacity(columns.len()),
            context_columns: context.clone(),
        };

        let mut eligible = Vec::new();
        for name in columns {
            let name = name.as_ref();
            match df.column(name) {
                Err(_) => {
                    warn!("Column '{}' does not exist in the dataset, skipping", name);
                    report
                        .outcomes
                        .push(NumericOutcome::skipped(name, NumericStrategy::NotFound));
                }
                Ok(col) if !is_numeric_dtype(col.dtype()) => {
                    warn!(
                        "Column '{}' is {} rather than numeric, skipping",
                        name,
                        col.dtype()
                    );
                    report
                        .outcomes
                        .push(NumericOutcome::skipped(name, NumericStrategy::NotNumeric));
                }
                Ok(_) => eligible.push(name.to_string()),
            }
        }

        if eligible.is_empty() {
            info!("No numeric columns eligible for imputation, dataset left unchanged");
            return Ok(report);
        }

        let original_dtypes: Vec<DataType> = eligible
            .iter()
            .map(|name| df.column(name).map(|c| c.dtype().clone()))
            .collect::<PolarsResult<_>>()?;

        let knn = KnnImputer::new(self.config.neighbor_count);
        let first = report.outcomes.len();
        for name in &eligible {
            let outcome = self.impute_column(df, name, &context, &knn)?;
            report.outcomes.push(outcome);
        }

        for (outcome, dtype) in report.outcomes[first..].iter().zip(&original_dtypes) {
            if outcome.restored_integer {
                restore_integer_dtype(df, &outcome.column, dtype)?;
            }
        }

        Ok(report)
    }

    fn impute_column(
        &self,
        df: &mut DataFrame,
        name: &str,
        context: &[String],
        knn: &KnnImputer,
    ) -> Result<NumericOutcome> {
        let column = df.column(name)?;
        let integer_origin = is_integer_dtype(column.dtype());
        let is_missing = column.is_null();
        let values = numeric_values(column.as_materialized_series())?;

        let total = values.len();
        let missing = values.iter().filter(|v| v.is_none()).count();
        let ratio = missing_ratio(missing, total);
        let tier = self.tier(ratio);

        info!(
            "Analyzing '{}': {} of {} missing ({:.2}%), {:?} missingness",
            name,
            missing,
            total,
            ratio * 100.0,
            tier
        );

        let mut indicator = None;
        if tier == MissingnessTier::High && self.config.add_missing_indicator {
            let indicator_name = format!("{}{}", name, MISSING_INDICATOR_SUFFIX);
            let flags: Vec<i64> = is_missing
                .into_iter()
                .map(|m| i64::from(m.unwrap_or(false)))
                .collect();
            df.with_column(Series::new(indicator_name.as_str().into(), flags))?;
            debug!("Added indicator column '{}'", indicator_name);
            indicator = Some(indicator_name);
        }

        let use_neighbors = match tier {
            MissingnessTier::Low => false,
            MissingnessTier::Moderate => true,
            MissingnessTier::High => self.config.use_neighbor_imputation_for_high_missing,
        };

        let (strategy, filled_values) = if missing == 0 {
            (NumericStrategy::Complete, None)
        } else if missing == total {
            warn!("'{}' has no present values to fill from", name);
            (NumericStrategy::Unfilled, None)
        } else if use_neighbors {
            let filled = knn.impute_column(df, name, context)?;
            (
                NumericStrategy::Neighbors {
                    neighbors: knn.n_neighbors(),
                },
                Some(filled),
            )
        } else {
            match df.column(name)?.as_materialized_series().median() {
                Some(m) => {
                    let filled = values.iter().map(|v| v.unwrap_or(m)).collect();
                    (NumericStrategy::Median { value: m }, Some(filled))
                }
                None => (NumericStrategy::Unfilled, None),
            }
        };

        let filled = if filled_values.is_some() { missing } else { 0 };
        let restored_integer = filled > 0 && integer_origin;

        if let Some(filled_values) = filled_values {
            df.replace(name, Series::new(name.into(), filled_values))?;
        }

        info!("'{}' -> {}", name, strategy);

        Ok(NumericOutcome {
            column: name.to_string(),
            strategy,
            tier: Some(tier),
            missing_count: missing,
            missing_ratio: ratio,
            filled,
            indicator,
            restored_integer,
        })
    }

    fn tier(&self, ratio: f64) -> MissingnessTier {
        if ratio <= self.config.low_missing_threshold {
            MissingnessTier::Low
        } else if ratio <= self.config.high_missing_threshold {
            MissingnessTier::Moderate
        } else {
            MissingnessTier::High
        }
    }
}

/// Round a filled column and cast it back to the integer dtype it was read
/// with. Filled values lie between present ones, so the cast stays in range.
fn restore_integer_dtype(df: &mut DataFrame, name: &str, dtype: &DataType) -> Result<()> {
    let series = df.column(name)?.as_materialized_series();
    let rounded = series
        .f64()?
        .apply_values(f64::round)
        .into_series()
        .cast(dtype)?;
    df.replace(name, rounded)?;
    debug!("Restored '{}' to {}", name, dtype);
    Ok(())
}
