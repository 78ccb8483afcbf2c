//! Data cleaning stages that prepare a raw export for imputation.
//!
//! This module provides functionality for:
//! - Setting the row identifier aside for the duration of a run
//! - Removing duplicate rows
//! - Dropping constant and near-unique columns
//! - Normalizing text and missing markers
//! - Strict type coercion and ordinal relabeling

mod converters;
mod sanitizers;

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::utils::column_names;
use converters::{coerce_series, relabel_series};
use polars::prelude::*;
use sanitizers::normalize_text_series;
use tracing::{debug, info, warn};

/// Outcome of the type coercion stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercionReport {
    /// Columns whose dtype was changed.
    pub converted: Vec<String>,
    /// One message per column that could not be converted.
    pub failures: Vec<String>,
}

/// Temporary position column used to map deduplicated rows back to the
/// detached identifier.
const ROW_INDEX: &str = "__row_index";

/// Data cleaner driven by a [`CleaningConfig`].
#[derive(Debug, Clone, Default)]
pub struct DataCleaner {
    config: CleaningConfig,
}

impl DataCleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Take the configured identifier column out of `df`.
    ///
    /// Returns `None` when no identifier is configured or the column is not
    /// present.
    pub fn detach_id(&self, df: &mut DataFrame) -> Result<Option<Column>> {
        let Some(id) = self.config.id_column.as_deref() else {
            return Ok(None);
        };

        if df.column(id).is_err() {
            warn!("Identifier column '{}' not found, rows stay unkeyed", id);
            return Ok(None);
        }

        debug!("Detached identifier column '{}'", id);
        Ok(Some(df.drop_in_place(id)?))
    }

    /// Put a detached identifier back as the first column.
    ///
    /// `kept` holds the row positions that survived duplicate removal, if
    /// rows were dropped after the identifier was detached.
    pub fn reattach_id(df: &mut DataFrame, id: Option<Column>, kept: Option<&IdxCa>) -> Result<()> {
        let Some(id) = id else {
            return Ok(());
        };

        let id = match kept {
            Some(rows) => id.take(rows)?,
            None => id,
        };

        if id.len() != df.height() {
            return Err(CleaningError::InvalidConfig(format!(
                "identifier column '{}' has {} rows, dataset has {}",
                id.name(),
                id.len(),
                df.height()
            )));
        }

        df.insert_column(0, id)?;
        Ok(())
    }

    /// Remove exact duplicate rows, keeping the first occurrence and the
    /// original row order.
    ///
    /// Returns the action message and the positions of the kept rows.
    pub fn remove_duplicates(&self, df: &mut DataFrame) -> Result<(String, IdxCa)> {
        let before = df.height();
        let subset = column_names(df);
        if subset.is_empty() {
            let kept = IdxCa::from_vec(ROW_INDEX.into(), (0..before as IdxSize).collect());
            return Ok(("No duplicate rows found".to_string(), kept));
        }

        let unique = df.with_row_index(ROW_INDEX.into(), None)?.unique_stable(
            Some(subset.as_slice()),
            UniqueKeepStrategy::First,
            None,
        )?;
        let kept = unique
            .column(ROW_INDEX)?
            .as_materialized_series()
            .idx()?
            .clone();
        *df = unique.drop(ROW_INDEX)?;

        let removed = before - df.height();
        let action = if removed > 0 {
            let pct = (removed as f64 / before as f64) * 100.0;
            debug!("Removed {} duplicate rows", removed);
            format!("Removed {} duplicate rows ({:.1}%)", removed, pct)
        } else {
            debug!("No duplicate rows found");
            "No duplicate rows found".to_string()
        };

        Ok((action, kept))
    }

    /// Drop constant columns and columns whose distinct-value ratio exceeds
    /// the cardinality threshold. A null counts as a value.
    pub fn drop_uninformative_columns(&self, df: &mut DataFrame) -> Result<Vec<String>> {
        let height = df.height();
        if height == 0 {
            return Ok(Vec::new());
        }

        let mut to_drop = Vec::new();
        for name in column_names(df) {
            let distinct = df.column(&name)?.as_materialized_series().n_unique()?;
            let ratio = distinct as f64 / height as f64;

            if distinct == 1 {
                debug!("'{}' is constant", name);
                to_drop.push(name);
            } else if ratio > self.config.cardinality_threshold {
                debug!(
                    "'{}' has {:.1}% distinct values",
                    name,
                    ratio * 100.0
                );
                to_drop.push(name);
            }
        }

        if !to_drop.is_empty() {
            *df = df.drop_many(to_drop.iter().map(|s| s.as_str()));
            info!("Dropped {} uninformative columns: {:?}", to_drop.len(), to_drop);
        }

        Ok(to_drop)
    }

    /// Trim text columns, null out missing markers and apply the configured
    /// replacements. Returns the number of cells that became null.
    pub fn normalize_text(&self, df: &mut DataFrame) -> Result<usize> {
        let mut total_nulled = 0;

        for name in column_names(df) {
            let column = df.column(&name)?;
            if column.dtype() != &DataType::String {
                continue;
            }

            let replacements = self.config.text_replacements.get(&name);
            let (cleaned, nulled) =
                normalize_text_series(column.as_materialized_series(), replacements)?;
            df.replace(&name, cleaned)?;
            total_nulled += nulled;
        }

        debug!("Normalized text columns, {} markers set to null", total_nulled);
        Ok(total_nulled)
    }

    /// Apply the configured per-column type coercions.
    ///
    /// A column that cannot be converted is left as it was and reported in
    /// [`CoercionReport::failures`].
    pub fn coerce_types(&self, df: &mut DataFrame) -> Result<CoercionReport> {
        let mut report = CoercionReport::default();

        for (name, target) in &self.config.type_coercions {
            let Ok(column) = df.column(name) else {
                debug!("Coercion target '{}' not present, skipping", name);
                continue;
            };

            let before = column.dtype().clone();
            match coerce_series(column.as_materialized_series(), *target) {
                Ok(series) => {
                    let changed = series.dtype() != &before;
                    df.replace(name, series)?;
                    if changed {
                        debug!("Converted '{}' from {} to {}", name, before, target.name());
                        report.converted.push(name.clone());
                    }
                }
                Err(e) => {
                    warn!("{}; column left unchanged", e);
                    report.failures.push(e.to_string());
                }
            }
        }

        Ok(report)
    }

    /// Replace ordinal integer codes with their labels.
    ///
    /// Returns the relabeled columns. Columns that do not hold integer codes
    /// are left unchanged with a warning.
    pub fn relabel_ordinals(&self, df: &mut DataFrame) -> Result<Vec<String>> {
        let mut relabeled = Vec::new();

        for (name, mapping) in &self.config.ordinal_mappings {
            let Ok(column) = df.column(name) else {
                continue;
            };

            match relabel_series(column.as_materialized_series(), mapping) {
                Some((labels, unmapped)) => {
                    if unmapped > 0 {
                        warn!("'{}' has {} codes without a label, set to null", name, unmapped);
                    }
                    df.replace(name, labels)?;
                    relabeled.push(name.clone());
                }
                None => warn!("'{}' does not hold integer codes, left unchanged", name),
            }
        }

        Ok(relabeled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetType;
    use crate::utils::text_values;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn passthrough() -> DataCleaner {
        DataCleaner::new(CleaningConfig::passthrough())
    }

    #[test]
    fn test_detach_and_reattach_id() {
        let mut df = df![
            "department" => ["Sales", "R&D"],
            "employee_number" => [7i64, 9],
        ]
        .unwrap();
        let cleaner = DataCleaner::default();

        let id = cleaner.detach_id(&mut df).unwrap();
        assert_eq!(column_names(&df), vec!["department"]);

        DataCleaner::reattach_id(&mut df, id, None).unwrap();
        assert_eq!(column_names(&df), vec!["employee_number", "department"]);
    }

    #[test]
    fn test_detach_missing_id_is_noop() {
        let mut df = df!["department" => ["Sales"]].unwrap();
        let id = DataCleaner::default().detach_id(&mut df).unwrap();
        assert!(id.is_none());
        assert_eq!(df.width(), 1);
    }

    #[test]
    fn test_remove_duplicates_keeps_first_in_order() {
        let mut df = df![
            "department" => ["Sales", "R&D", "Sales", "HR", "R&D"],
            "age" => [Some(30i64), Some(41), Some(30), None, Some(41)],
        ]
        .unwrap();

        let (action, kept) = passthrough().remove_duplicates(&mut df).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(
            text_values(df.column("department").unwrap().as_materialized_series()).unwrap(),
            vec![
                Some("Sales".to_string()),
                Some("R&D".to_string()),
                Some("HR".to_string())
            ]
        );
        let kept: Vec<Option<IdxSize>> = kept.into_iter().collect();
        assert_eq!(kept, vec![Some(0), Some(1), Some(3)]);
        assert_eq!(column_names(&df), vec!["department", "age"]);
        assert!(action.contains("Removed 2 duplicate rows"));
    }

    #[test]
    fn test_duplicates_ignore_detached_id() {
        let mut df = df![
            "employee_number" => [1i64, 2, 3],
            "department" => ["Sales", "Sales", "R&D"],
        ]
        .unwrap();
        let cleaner = DataCleaner::default();

        let id = cleaner.detach_id(&mut df).unwrap();
        let (_, kept) = cleaner.remove_duplicates(&mut df).unwrap();
        DataCleaner::reattach_id(&mut df, id, Some(&kept)).unwrap();

        let ids: Vec<Option<i64>> = df
            .column("employee_number")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_drop_uninformative_columns() {
        let mut df = df![
            "over18" => ["Y", "Y", "Y", "Y"],
            "serial" => ["a", "b", "c", "d"],
            "department" => ["Sales", "R&D", "Sales", "HR"],
            "bonus" => [None, None, Some(1.0), Some(1.0)],
        ]
        .unwrap();
        let cleaner = DataCleaner::new(CleaningConfig {
            cardinality_threshold: 0.95,
            ..CleaningConfig::passthrough()
        });

        let dropped = cleaner.drop_uninformative_columns(&mut df).unwrap();

        assert_eq!(dropped, vec!["over18", "serial"]);
        assert_eq!(column_names(&df), vec!["department", "bonus"]);
    }

    #[test]
    fn test_all_null_column_counts_as_constant() {
        let mut df = df![
            "empty" => [Option::<f64>::None, None],
            "department" => ["Sales", "R&D"],
        ]
        .unwrap();

        let dropped = passthrough().drop_uninformative_columns(&mut df).unwrap();
        assert_eq!(dropped, vec!["empty"]);
    }

    #[test]
    fn test_normalize_text_uses_column_replacements() {
        let mut df = df![
            "business_travel" => [Some("Travel_Rarely "), Some("nan"), Some("Non-Travel")],
            "age" => [Some(30i64), None, Some(22)],
        ]
        .unwrap();

        let nulled = DataCleaner::default().normalize_text(&mut df).unwrap();

        assert_eq!(nulled, 1);
        assert_eq!(
            text_values(df.column("business_travel").unwrap().as_materialized_series()).unwrap(),
            vec![Some("Rarely".to_string()), None, Some("Non".to_string())]
        );
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_coerce_types_reports_failures_and_continues() {
        let mut df = df![
            "age" => ["35", "forty"],
            "daily_rate" => ["1102", "279"],
        ]
        .unwrap();
        let cleaner = DataCleaner::new(CleaningConfig {
            type_coercions: BTreeMap::from([
                ("age".to_string(), TargetType::Int),
                ("daily_rate".to_string(), TargetType::Float),
                ("absent".to_string(), TargetType::Float),
            ]),
            ..CleaningConfig::passthrough()
        });

        let report = cleaner.coerce_types(&mut df).unwrap();

        assert_eq!(report.converted, vec!["daily_rate"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("daily_rate").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_relabel_ordinals_with_defaults() {
        let mut df = df![
            "job_level" => [Some(1i64), Some(4), Some(7), None],
            "department" => ["Sales", "R&D", "HR", "Sales"],
        ]
        .unwrap();

        let relabeled = DataCleaner::default().relabel_ordinals(&mut df).unwrap();

        assert_eq!(relabeled, vec!["job_level"]);
        assert_eq!(
            text_values(df.column("job_level").unwrap().as_materialized_series()).unwrap(),
            vec![
                Some("Entry Level".to_string()),
                Some("Manager".to_string()),
                None,
                None
            ]
        );
    }
}
