//! Mode-or-fallback imputation for categorical columns.
//!
//! A column is only filled with its mode when the mode is both frequent and
//! clearly ahead of the runner-up. Otherwise, or when too much of the column
//! is missing, the gaps become an explicit fallback category.

use crate::config::CategoricalImputationConfig;
use crate::error::Result;
use crate::imputers::stats::{frequency_ranking, missing_ratio};
use crate::types::{CategoricalOutcome, CategoricalReport, CategoricalStrategy, ModeStatistics};
use crate::utils::text_values;
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Fills missing cells of categorical columns with the mode or a fallback label.
#[derive(Debug, Clone, Default)]
pub struct CategoricalImputer {
    config: CategoricalImputationConfig,
}

impl CategoricalImputer {
    pub fn new(config: CategoricalImputationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CategoricalImputationConfig {
        &self.config
    }

    /// Fill every missing cell of the named columns.
    ///
    /// Absent columns are reported as [`CategoricalStrategy::NotFound`] and
    /// skipped. Filled columns are stored as `String`; a column without
    /// missing cells is left untouched.
    pub fn impute<S: AsRef<str>>(
        &self,
        df: &mut DataFrame,
        columns: &[S],
    ) -> Result<CategoricalReport> {
        let mut report = CategoricalReport::default();

        for name in columns {
            let name = name.as_ref();
            let outcome = self.impute_column(df, name)?;
            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    fn impute_column(&self, df: &mut DataFrame, name: &str) -> Result<CategoricalOutcome> {
        let Ok(column) = df.column(name) else {
            warn!("Column '{}' does not exist in the dataset, skipping", name);
            return Ok(CategoricalOutcome::not_found(name));
        };

        let values = text_values(column.as_materialized_series())?;
        let total = values.len();
        let missing = values.iter().filter(|v| v.is_none()).count();
        let ratio = missing_ratio(missing, total);

        info!(
            "Analyzing '{}': {} of {} missing ({:.2}%)",
            name,
            missing,
            total,
            ratio * 100.0
        );

        let (strategy, mode_statistics) = self.decide(&values, ratio);
        info!("'{}' -> {}", name, strategy);

        let fill = match &strategy {
            CategoricalStrategy::Mode { value } => value.as_str(),
            _ => self.config.fallback_label.as_str(),
        };

        if missing > 0 {
            let filled: Vec<&str> = values
                .iter()
                .map(|v| v.as_deref().unwrap_or(fill))
                .collect();
            df.replace(name, Series::new(name.into(), filled))?;
        }

        Ok(CategoricalOutcome {
            column: name.to_string(),
            strategy,
            total_rows: total,
            missing_count: missing,
            missing_ratio: ratio,
            filled: missing,
            mode_statistics,
        })
    }

    /// Pick the fill rule for a column from its values and missing ratio.
    fn decide(
        &self,
        values: &[Option<String>],
        ratio: f64,
    ) -> (CategoricalStrategy, Option<ModeStatistics>) {
        let config = &self.config;

        if ratio > config.high_missing_threshold {
            debug!(
                "Missing ratio {:.2}% exceeds {:.0}%",
                ratio * 100.0,
                config.high_missing_threshold * 100.0
            );
            return (CategoricalStrategy::FallbackHighMissing, None);
        }

        let ranking = frequency_ranking(values);
        let Some((top_value, top_count)) = ranking.first() else {
            return (CategoricalStrategy::FallbackNoValues, None);
        };

        let total = values.len() as f64;
        let top_share = *top_count as f64 / total;
        let (second_value, second_share) = match ranking.get(1) {
            Some((value, count)) => (Some(value.clone()), *count as f64 / total),
            None => (None, 0.0),
        };
        let margin = top_share - second_share;

        let required_share = if ratio <= config.low_missing_threshold {
            config.mode_threshold_low_missing
        } else {
            config.mode_threshold_high_missing
        };

        debug!(
            "Mode '{}' ({:.2}%), runner-up {:?} ({:.2}%), margin {:.2}%",
            top_value,
            top_share * 100.0,
            second_value,
            second_share * 100.0,
            margin * 100.0
        );

        let statistics = ModeStatistics {
            top_value: top_value.clone(),
            top_share,
            second_value,
            second_share,
            margin,
            required_share,
        };

        let strategy = if top_share >= required_share && margin >= config.mode_margin_threshold {
            CategoricalStrategy::Mode {
                value: top_value.clone(),
            }
        } else {
            CategoricalStrategy::FallbackWeakMode
        };

        (strategy, Some(statistics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Build a column with the given label counts followed by `missing` nulls.
    fn column(counts: &[(&str, usize)], missing: usize) -> Vec<Option<String>> {
        let mut values = Vec::new();
        for (label, count) in counts {
            values.extend(std::iter::repeat_n(Some(label.to_string()), *count));
        }
        values.extend(std::iter::repeat_n(None, missing));
        values
    }

    fn frame(values: Vec<Option<String>>) -> DataFrame {
        DataFrame::new(vec![Series::new("department".into(), values).into()]).unwrap()
    }

    fn values_of(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        text_values(df.column(name).unwrap().as_materialized_series()).unwrap()
    }

    #[test]
    fn test_low_missing_dominant_mode_fills_with_mode() {
        // 100 rows, 3 missing: A=60%, B=35% -> margin 25%
        let mut df = frame(column(&[("A", 60), ("B", 35), ("C", 2)], 3));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        let outcome = report.outcome("department").unwrap();
        assert_eq!(
            outcome.strategy,
            CategoricalStrategy::Mode {
                value: "A".to_string()
            }
        );
        assert_eq!(outcome.filled, 3);
        assert_eq!(df.column("department").unwrap().null_count(), 0);

        let values = values_of(&df, "department");
        assert!(values[97..].iter().all(|v| v.as_deref() == Some("A")));

        let stats = outcome.mode_statistics.as_ref().unwrap();
        assert_eq!(stats.required_share, 0.50);
        assert_eq!(stats.second_value.as_deref(), Some("B"));
    }

    #[test]
    fn test_high_missing_uses_fallback_regardless_of_mode() {
        // 25% missing, mode would otherwise qualify
        let mut df = frame(column(&[("A", 70), ("B", 5)], 25));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        let outcome = report.outcome("department").unwrap();
        assert_eq!(outcome.strategy, CategoricalStrategy::FallbackHighMissing);
        assert_eq!(outcome.filled, 25);

        let values = values_of(&df, "department");
        assert_eq!(
            values.iter().filter(|v| v.as_deref() == Some("Unknown")).count(),
            25
        );
        assert_eq!(values.iter().filter(|v| v.as_deref() == Some("A")).count(), 70);
    }

    #[test]
    fn test_missing_ratio_at_high_threshold_takes_mode_branch() {
        // exactly 20% missing is not "greater than" 20%
        let mut df = frame(column(&[("A", 70), ("B", 10)], 20));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        let outcome = report.outcome("department").unwrap();
        assert_eq!(outcome.missing_ratio, 0.20);
        assert_eq!(
            outcome.strategy,
            CategoricalStrategy::Mode {
                value: "A".to_string()
            }
        );
        // moderate missingness applies the stricter share threshold
        assert_eq!(outcome.mode_statistics.as_ref().unwrap().required_share, 0.60);
    }

    #[test]
    fn test_weak_mode_share_falls_back() {
        // 3% missing, A=45% is below the 50% share threshold
        let mut df = frame(column(&[("A", 45), ("B", 20), ("C", 32)], 3));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        assert_eq!(
            report.outcome("department").unwrap().strategy,
            CategoricalStrategy::FallbackWeakMode
        );
        let values = values_of(&df, "department");
        assert!(values[97..].iter().all(|v| v.as_deref() == Some("Unknown")));
    }

    #[test]
    fn test_narrow_margin_falls_back() {
        // A=55%, B=40%: share passes, margin of 15% does not
        let mut df = frame(column(&[("A", 55), ("B", 40), ("C", 2)], 3));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        assert_eq!(
            report.outcome("department").unwrap().strategy,
            CategoricalStrategy::FallbackWeakMode
        );
    }

    #[test]
    fn test_moderate_missing_requires_higher_share() {
        // 10% missing, A=55% passes 50% but not the 60% moderate threshold
        let mut df = frame(column(&[("A", 55), ("B", 30), ("C", 5)], 10));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        assert_eq!(
            report.outcome("department").unwrap().strategy,
            CategoricalStrategy::FallbackWeakMode
        );
    }

    #[test]
    fn test_single_value_column_has_full_margin() {
        let mut df = frame(column(&[("Sales", 9)], 1));
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        let outcome = report.outcome("department").unwrap();
        assert_eq!(
            outcome.strategy,
            CategoricalStrategy::Mode {
                value: "Sales".to_string()
            }
        );
        let stats = outcome.mode_statistics.as_ref().unwrap();
        assert_eq!(stats.second_value, None);
        assert_eq!(stats.second_share, 0.0);
    }

    #[test]
    fn test_no_present_values_uses_fallback() {
        // permissive threshold so the all-missing column reaches the ranking step
        let config = CategoricalImputationConfig {
            high_missing_threshold: 1.0,
            ..Default::default()
        };
        let mut df = frame(vec![None, None, None]);
        let imputer = CategoricalImputer::new(config);

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        assert_eq!(
            report.outcome("department").unwrap().strategy,
            CategoricalStrategy::FallbackNoValues
        );
        assert_eq!(df.column("department").unwrap().null_count(), 0);
    }

    #[test]
    fn test_custom_fallback_label() {
        let config = CategoricalImputationConfig {
            fallback_label: "Not Reported".to_string(),
            ..Default::default()
        };
        let mut df = frame(column(&[("A", 5)], 5));
        let imputer = CategoricalImputer::new(config);

        imputer.impute(&mut df, &["department"]).unwrap();

        let values = values_of(&df, "department");
        assert_eq!(values[9].as_deref(), Some("Not Reported"));
    }

    #[test]
    fn test_missing_column_is_reported_and_skipped() {
        let mut df = df![
            "department" => [Some("Sales"), None, Some("Sales")],
        ]
        .unwrap();
        let imputer = CategoricalImputer::default();

        let report = imputer
            .impute(&mut df, &["gender", "department"])
            .unwrap();

        assert_eq!(report.skipped(), vec!["gender"]);
        assert_eq!(df.column("department").unwrap().null_count(), 0);
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_complete_column_is_unchanged() {
        let mut df = df![
            "department" => ["Sales", "R&D", "Sales"],
            "age" => [30i64, 40, 50],
        ]
        .unwrap();
        let before = df.clone();
        let imputer = CategoricalImputer::default();

        let report = imputer.impute(&mut df, &["department"]).unwrap();

        assert!(df.equals_missing(&before));
        assert_eq!(report.total_filled(), 0);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let mut df = frame(column(&[("A", 60), ("B", 35), ("C", 2)], 3));
        let imputer = CategoricalImputer::default();

        imputer.impute(&mut df, &["department"]).unwrap();
        let after_first = df.clone();
        let report = imputer.impute(&mut df, &["department"]).unwrap();

        assert!(df.equals_missing(&after_first));
        assert_eq!(report.outcome("department").unwrap().filled, 0);
    }

    #[test]
    fn test_other_columns_and_order_are_untouched() {
        let mut df = df![
            "id" => [1i64, 2, 3, 4],
            "department" => [Some("Sales"), None, Some("Sales"), Some("Sales")],
            "age" => [Some(30.0), None, Some(50.0), Some(41.0)],
        ]
        .unwrap();
        let imputer = CategoricalImputer::default();

        imputer.impute(&mut df, &["department"]).unwrap();

        assert_eq!(
            df.get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec!["id", "department", "age"]
        );
        assert_eq!(df.column("age").unwrap().null_count(), 1);
    }
}
