//! Shared utilities for the cleaning pipeline.
//!
//! Dtype checks and conversions between polars columns and plain vectors
//! used by the cleaners and imputers.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Check if a DataType is an integer type.
#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType holds text labels.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// Missing Markers
// =============================================================================

/// Literal placeholders that exports use in place of an empty cell.
pub const MISSING_MARKERS: [&str; 5] = ["nan", "NaN", "None", "NULL", "null"];

/// Check if a raw text value stands for a missing cell.
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

// =============================================================================
// Series Conversion Utilities
// =============================================================================

/// Read a numeric Series as `f64` values, preserving nulls.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series.f64()?.into_iter().collect())
}

/// Read a text Series as owned strings, preserving nulls.
pub fn text_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let str_series = series.cast(&DataType::String)?;
    Ok(str_series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Number of null cells in the named columns that exist in `df`.
pub fn count_missing(df: &DataFrame, columns: &[String]) -> usize {
    columns
        .iter()
        .filter_map(|name| df.column(name).ok())
        .map(|col| col.null_count())
        .sum()
}

/// Names of all columns in `df`, owned.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
