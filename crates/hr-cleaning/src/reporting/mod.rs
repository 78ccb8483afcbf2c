//! JSON run reports.
//!
//! A [`CleaningReport`] wraps the [`CleaningSummary`] of one pipeline run with
//! the input and output paths and a generation timestamp. It is used for the
//! CLI's `--json` output as well as the `--emit-report` file.
//!
//! # Example
//!
//! ```rust,ignore
//! use hr_cleaning::reporting::{CleaningReport, ReportWriter};
//!
//! let report = CleaningReport::new("raw.csv", Some("out/hr.csv"), result.summary.clone());
//! let path = ReportWriter::new().write_next_to(&report, "out/hr.csv")?;
//! ```

use crate::error::Result;
use crate::types::CleaningSummary;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything known about one cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// UTC timestamp, RFC 3339
    pub generated_at: String,
    pub input_file: String,
    /// Where the cleaned CSV was written, if it was
    pub output_file: Option<String>,
    pub summary: CleaningSummary,
}

impl CleaningReport {
    pub fn new(
        input_file: impl AsRef<Path>,
        output_file: Option<&Path>,
        summary: CleaningSummary,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            input_file: input_file.as_ref().display().to_string(),
            output_file: output_file.map(|p| p.display().to_string()),
            summary,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes reports as pretty-printed JSON files.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    suffix: String,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self {
            suffix: "_report.json".to_string(),
        }
    }
}

impl ReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the report belonging to `csv_path`: same directory, file
    /// stem plus `_report.json`.
    pub fn report_path(&self, csv_path: impl AsRef<Path>) -> PathBuf {
        let csv_path = csv_path.as_ref();
        let stem = csv_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cleaning".to_string());
        csv_path.with_file_name(format!("{}{}", stem, self.suffix))
    }

    /// Write the report next to the exported CSV and return its path.
    pub fn write_next_to(
        &self,
        report: &CleaningReport,
        csv_path: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let report_path = self.report_path(csv_path);
        self.write(report, &report_path)?;
        Ok(report_path)
    }

    /// Write the report to `path`, creating parent directories.
    pub fn write(&self, report: &CleaningReport, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        file.write_all(report.to_json()?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(())
    }
}
