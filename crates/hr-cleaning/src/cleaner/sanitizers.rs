//! Text normalization for raw exports.

use crate::error::Result;
use crate::utils::is_missing_marker;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Trim a text series, turn empty strings and missing markers into nulls,
/// and apply the literal replacements for this column.
///
/// Returns the new series and the number of cells that became null.
pub(crate) fn normalize_text_series(
    series: &Series,
    replacements: Option<&BTreeMap<String, String>>,
) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut cleaned_values: Vec<Option<String>> = Vec::with_capacity(str_series.len());
    let mut nulled = 0;

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) if is_missing_marker(val) => {
                cleaned_values.push(None);
                nulled += 1;
            }
            Some(val) => {
                let trimmed = val.trim();
                let replaced = replacements
                    .and_then(|map| map.get(trimmed))
                    .map(String::as_str)
                    .unwrap_or(trimmed);
                cleaned_values.push(Some(replaced.to_string()));
            }
            None => cleaned_values.push(None),
        }
    }

    Ok((
        Series::new(series.name().clone(), cleaned_values),
        nulled,
    ))
}
