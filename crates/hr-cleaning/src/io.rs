//! CSV input and output.

use crate::error::{CleaningError, Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// Rows sampled for schema inference.
const INFER_SCHEMA_ROWS: usize = 100;

/// Read a CSV file with a header row into a DataFrame.
///
/// Column types are inferred from the first rows; empty fields are nulls.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CleaningError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read {}", path.display()))?;

    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Write a DataFrame as CSV with a header row, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .context(format!("Failed to write {}", path.display()))?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    info!("Dataset saved: {}", path.display());
    Ok(())
}
