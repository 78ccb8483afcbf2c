//! Missing-value imputation.
//!
//! - [`CategoricalImputer`]: mode or fallback label, gated by missingness
//!   and mode dominance
//! - [`NumericImputer`]: median, nearest neighbors, or indicator plus fill,
//!   by missingness tier
//! - [`Imputation`]: runs both over declared columns, categorical first

mod categorical;
mod knn;
mod numeric;
pub mod stats;

pub use categorical::CategoricalImputer;
pub use knn::KnnImputer;
pub use numeric::{MISSING_INDICATOR_SUFFIX, NumericImputer};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::types::{ColumnKind, ColumnSpec, ImputationReport};
use polars::prelude::*;
use tracing::info;

/// Applies the categorical imputer to the declared categorical columns and
/// then the numeric imputer to the declared numeric columns.
#[derive(Debug, Clone, Default)]
pub struct Imputation {
    categorical: CategoricalImputer,
    numeric: NumericImputer,
}

impl Imputation {
    pub fn new(categorical: CategoricalImputer, numeric: NumericImputer) -> Self {
        Self {
            categorical,
            numeric,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            CategoricalImputer::new(config.categorical.clone()),
            NumericImputer::new(config.numeric.clone()),
        )
    }

    pub fn categorical(&self) -> &CategoricalImputer {
        &self.categorical
    }

    pub fn numeric(&self) -> &NumericImputer {
        &self.numeric
    }

    /// Impute `df` in place.
    pub fn apply(&self, df: &mut DataFrame, columns: &[ColumnSpec]) -> Result<ImputationReport> {
        let (categorical, numeric) = split_by_kind(columns);

        info!(
            "Imputing {} categorical and {} numeric columns",
            categorical.len(),
            numeric.len()
        );

        let categorical = self.categorical.impute(df, &categorical)?;
        let numeric = self.numeric.impute(df, &numeric)?;

        Ok(ImputationReport {
            categorical,
            numeric,
        })
    }

    /// Take ownership of `df`, impute it and hand it back.
    pub fn transform(
        &self,
        mut df: DataFrame,
        columns: &[ColumnSpec],
    ) -> Result<(DataFrame, ImputationReport)> {
        let report = self.apply(&mut df, columns)?;
        Ok((df, report))
    }
}

fn split_by_kind(columns: &[ColumnSpec]) -> (Vec<&str>, Vec<&str>) {
    let mut categorical = Vec::new();
    let mut numeric = Vec::new();
    for spec in columns {
        match spec.kind {
            ColumnKind::Categorical => categorical.push(spec.name.as_str()),
            ColumnKind::Numeric => numeric.push(spec.name.as_str()),
        }
    }
    (categorical, numeric)
}
