//! Strict type coercion and ordinal relabeling.

use crate::config::TargetType;
use crate::error::{CleaningError, Result};
use crate::utils::{is_numeric_dtype, is_text_dtype, numeric_values, text_values};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Read a numeric or text series as floats. Text cells must parse as
/// numbers; the first one that does not is returned as the error value.
fn float_values(series: &Series) -> std::result::Result<Vec<Option<f64>>, String> {
    if is_numeric_dtype(series.dtype()) {
        return numeric_values(series).map_err(|e| e.to_string());
    }
    if !is_text_dtype(series.dtype()) {
        return Err(format!("unsupported source dtype {}", series.dtype()));
    }

    let values = text_values(series).map_err(|e| e.to_string())?;
    values
        .into_iter()
        .map(|v| match v {
            Some(s) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("value '{}' is not a number", s)),
            None => Ok(None),
        })
        .collect()
}

/// Convert finite whole-number floats to integers; any other value fails.
fn whole_numbers(values: Vec<Option<f64>>) -> std::result::Result<Vec<Option<i64>>, String> {
    values
        .into_iter()
        .map(|v| match v {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Some(f as i64))
            }
            Some(f) => Err(format!("value {} is not a whole number", f)),
            None => Ok(None),
        })
        .collect()
}

/// Cast a series to the target type without losing information.
///
/// Nulls stay null. Any present value that cannot be represented exactly in
/// the target type fails the whole column.
pub(crate) fn coerce_series(series: &Series, target: TargetType) -> Result<Series> {
    let name = series.name().clone();
    let fail = |reason: String| CleaningError::TypeConversionFailed {
        column: name.to_string(),
        target_type: target.name().to_string(),
        reason,
    };

    match target {
        TargetType::Text => Ok(series.cast(&DataType::String)?),
        TargetType::Float => {
            let values = float_values(series).map_err(fail)?;
            Ok(Series::new(name.clone(), values))
        }
        TargetType::Int => {
            let values = float_values(series).and_then(whole_numbers).map_err(fail)?;
            Ok(Series::new(name.clone(), values))
        }
    }
}

/// Replace integer codes with their labels. Codes without a label become
/// null; the second value counts them.
///
/// Returns `None` when the series holds something other than integer codes.
pub(crate) fn relabel_series(
    series: &Series,
    mapping: &BTreeMap<i64, String>,
) -> Option<(Series, usize)> {
    let codes = float_values(series).and_then(whole_numbers).ok()?;

    let mut unmapped = 0;
    let labels: Vec<Option<&str>> = codes
        .iter()
        .map(|code| match code {
            Some(c) => {
                let label = mapping.get(c).map(String::as_str);
                if label.is_none() {
                    unmapped += 1;
                }
                label
            }
            None => None,
        })
        .collect();

    Some((Series::new(series.name().clone(), labels), unmapped))
}
