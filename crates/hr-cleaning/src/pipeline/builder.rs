//! Main cleaning pipeline module.
//!
//! This module provides the core `CleaningPipeline` struct and builder for
//! running the cleaning stages and both imputers over one dataset.

use crate::cleaner::DataCleaner;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{Result, ResultExt};
use crate::imputers::Imputation;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{CleaningSummary, ColumnKind, ColumnSpec, ImputationReport, PipelineResult};
use crate::utils::{count_missing, is_numeric_dtype, is_text_dtype};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The HR cleaning pipeline.
///
/// Use [`CleaningPipeline::builder()`] to create a pipeline with custom
/// configuration.
///
/// # Example
///
/// ```rust,ignore
/// use hr_cleaning::{CleaningPipeline, PipelineConfig};
///
/// let result = CleaningPipeline::builder()
///     .config(PipelineConfig::builder().neighbor_count(7).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
/// ```
pub struct CleaningPipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    imputation: Imputation,
}

// Runs are often moved to a worker thread
static_assertions::assert_impl_all!(CleaningPipeline: Send);

impl CleaningPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> CleaningPipelineBuilder {
        CleaningPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean and impute a DataFrame.
    ///
    /// Stages run in order: identifier detach, duplicate removal, column
    /// pruning, text normalization, type coercion, ordinal relabeling,
    /// categorical imputation, numeric imputation, identifier reattach.
    ///
    /// # Errors
    ///
    /// Numeric computation failures (such as a constant column in the
    /// neighbor context) fail the whole run.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        match self.process_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage_started(&self, stage: PipelineStage) {
        info!("{}...", stage.display_name());
        self.report_progress(ProgressUpdate::new(
            stage,
            0.0,
            format!("{}...", stage.display_name()),
        ));
    }

    fn stage_finished(&self, stage: PipelineStage, message: impl Into<String>) {
        self.report_progress(ProgressUpdate::new(stage, 1.0, message));
    }

    fn process_internal(&self, mut df: DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let cleaning = &self.config.cleaning;

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();

        info!(
            "Starting cleaning pipeline: {} rows x {} columns",
            df.height(),
            df.width()
        );

        // Step 1: Identifier
        self.stage_started(PipelineStage::Initializing);
        let id = self.cleaner.detach_id(&mut df)?;
        if let Some(id) = &id {
            summary.add_action(format!("Set '{}' aside as row identifier", id.name()));
        }
        self.stage_finished(PipelineStage::Initializing, "Initialized");

        // Step 2: Duplicates
        let keep = if cleaning.remove_duplicates {
            self.stage_started(PipelineStage::Deduplication);
            let (action, kept) = self.cleaner.remove_duplicates(&mut df)?;
            self.stage_finished(PipelineStage::Deduplication, action.clone());
            summary.add_action(action);
            Some(kept)
        } else {
            None
        };

        // Step 3: Uninformative columns
        if cleaning.prune_columns {
            self.stage_started(PipelineStage::ColumnPruning);
            let dropped = self.cleaner.drop_uninformative_columns(&mut df)?;
            if dropped.is_empty() {
                summary.add_action("No uninformative columns found");
            } else {
                summary.add_action(format!(
                    "Removed {} uninformative columns: {:?}",
                    dropped.len(),
                    dropped
                ));
            }
            self.stage_finished(
                PipelineStage::ColumnPruning,
                format!("Dropped {} columns", dropped.len()),
            );
        }

        // Step 4: Text
        self.stage_started(PipelineStage::TextNormalization);
        let nulled = self.cleaner.normalize_text(&mut df)?;
        if nulled > 0 {
            summary.add_action(format!("Converted {} missing markers to null", nulled));
        }
        self.stage_finished(PipelineStage::TextNormalization, "Text normalized");

        // Step 5: Types
        self.stage_started(PipelineStage::TypeCoercion);
        let coercion = self.cleaner.coerce_types(&mut df)?;
        if !coercion.converted.is_empty() {
            summary.add_action(format!("Converted types of {:?}", coercion.converted));
        }
        for failure in coercion.failures {
            summary.add_warning(failure);
        }
        self.stage_finished(PipelineStage::TypeCoercion, "Types coerced");

        // Step 6: Ordinals
        self.stage_started(PipelineStage::OrdinalMapping);
        let relabeled = self.cleaner.relabel_ordinals(&mut df)?;
        if !relabeled.is_empty() {
            summary.add_action(format!("Relabeled ordinal columns {:?}", relabeled));
        }
        self.stage_finished(PipelineStage::OrdinalMapping, "Ordinals relabeled");

        // Step 7: Imputation
        let columns = self.imputation_columns(&df);
        let categorical = column_names_of(&columns, ColumnKind::Categorical);
        let numeric = column_names_of(&columns, ColumnKind::Numeric);

        self.stage_started(PipelineStage::CategoricalImputation);
        let categorical_report = self
            .imputation
            .categorical()
            .impute(&mut df, &categorical)
            .context("Categorical imputation failed")?;
        self.stage_finished(
            PipelineStage::CategoricalImputation,
            format!("Filled {} categorical cells", categorical_report.total_filled()),
        );

        self.stage_started(PipelineStage::NumericImputation);
        let numeric_report = self
            .imputation
            .numeric()
            .impute(&mut df, &numeric)
            .context("Numeric imputation failed")?;
        self.stage_finished(
            PipelineStage::NumericImputation,
            format!("Filled {} numeric cells", numeric_report.total_filled()),
        );

        summary.remaining_missing_categorical = count_missing(&df, &categorical);
        summary.remaining_missing_numeric = count_missing(&df, &numeric);
        summary.imputation = ImputationReport {
            categorical: categorical_report,
            numeric: numeric_report,
        };

        // Step 8: Finalize
        self.stage_started(PipelineStage::Finalizing);
        DataCleaner::reattach_id(&mut df, id, keep.as_ref())?;

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Pipeline finished in {} ms: {} rows x {} columns",
            summary.duration_ms,
            df.height(),
            df.width()
        );
        self.stage_finished(PipelineStage::Finalizing, "Finalized");

        Ok(PipelineResult { data: df, summary })
    }

    /// Text columns not excluded by configuration, then numeric columns that
    /// still have missing cells.
    fn imputation_columns(&self, df: &DataFrame) -> Vec<ColumnSpec> {
        let cleaning = &self.config.cleaning;
        let mut columns = Vec::new();

        for col in df.get_columns() {
            let name = col.name().as_str();
            if is_text_dtype(col.dtype()) && !cleaning.is_categorical_excluded(name) {
                columns.push(ColumnSpec::categorical(name));
            }
        }
        for col in df.get_columns() {
            if is_numeric_dtype(col.dtype()) && col.null_count() > 0 {
                columns.push(ColumnSpec::numeric(col.name().as_str()));
            }
        }

        columns
    }
}

fn column_names_of(columns: &[ColumnSpec], kind: ColumnKind) -> Vec<String> {
    columns
        .iter()
        .filter(|s| s.kind == kind)
        .map(|s| s.name.clone())
        .collect()
}

/// Builder for [`CleaningPipeline`].
#[derive(Default)]
pub struct CleaningPipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(CleaningPipelineBuilder: Send);

impl CleaningPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<CleaningPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(CleaningPipeline {
            cleaner: DataCleaner::new(config.cleaning.clone()),
            imputation: Imputation::from_config(&config),
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleaningConfig;
    use crate::utils::column_names;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> DataFrame {
        df![
            "employee_number" => [1i64, 2, 3, 4, 5, 6],
            "attrition" => [Some("No"), None, Some("Yes"), Some("No"), Some("No"), Some("No")],
            "department" => [Some("Sales"), Some("Sales"), Some(" nan "), Some("Sales"), Some("R&D"), Some("Sales")],
            "over18" => ["Y", "Y", "Y", "Y", "Y", "Y"],
            "age" => [Some(30i64), Some(30), Some(45), Some(52), None, Some(38)],
            "monthly_income" => [Some(3000.0), Some(3000.0), Some(5200.0), Some(7400.0), Some(4100.0), Some(4600.0)],
        ]
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = CleaningPipeline::builder().build().unwrap();
        assert_eq!(pipeline.config(), &PipelineConfig::default());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            numeric: crate::config::NumericImputationConfig {
                neighbor_count: 0,
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(CleaningPipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_with_progress_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let pipeline = CleaningPipeline::builder()
            .on_progress(move |_update| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        pipeline.report_progress(ProgressUpdate::new(PipelineStage::TypeCoercion, 0.5, "Test"));

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_process_runs_every_stage() {
        let result = CleaningPipeline::builder()
            .build()
            .unwrap()
            .process(sample())
            .unwrap();
        let df = &result.data;

        assert_eq!(
            column_names(df),
            vec!["employee_number", "attrition", "department", "age", "monthly_income"]
        );
        assert_eq!(df.height(), 6);

        // excluded from categorical imputation
        assert_eq!(df.column("attrition").unwrap().null_count(), 1);
        assert_eq!(df.column("department").unwrap().null_count(), 0);
        assert_eq!(df.column("age").unwrap().null_count(), 0);
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Int64);

        let summary = &result.summary;
        assert_eq!(summary.rows_before, 6);
        assert_eq!(summary.columns_before, 6);
        assert_eq!(summary.columns_after, 5);
        assert_eq!(summary.remaining_missing_categorical, 0);
        assert_eq!(summary.remaining_missing_numeric, 0);
        assert!(summary.imputation.categorical.outcome("attrition").is_none());
    }

    #[test]
    fn test_process_reports_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();

        CleaningPipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap()
            .process(sample())
            .unwrap();

        let stages = stages.lock().unwrap();
        assert_eq!(stages.first(), Some(&PipelineStage::Initializing));
        assert_eq!(stages.last(), Some(&PipelineStage::Complete));
        assert!(stages.contains(&PipelineStage::CategoricalImputation));
        assert!(stages.contains(&PipelineStage::NumericImputation));
    }

    #[test]
    fn test_each_imputation_stage_starts_and_finishes() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();

        CleaningPipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update))
            .build()
            .unwrap()
            .process(sample())
            .unwrap();

        let updates = updates.lock().unwrap();
        for stage in [
            PipelineStage::CategoricalImputation,
            PipelineStage::NumericImputation,
        ] {
            let stage_progress: Vec<f32> = updates
                .iter()
                .filter(|u| u.stage == stage)
                .map(|u| u.stage_progress)
                .collect();
            assert_eq!(stage_progress, vec![0.0, 1.0], "{:?}", stage);
        }

        let categorical_done = updates
            .iter()
            .position(|u| u.stage == PipelineStage::CategoricalImputation && u.stage_progress == 1.0);
        let numeric_started = updates
            .iter()
            .position(|u| u.stage == PipelineStage::NumericImputation && u.stage_progress == 0.0);
        assert!(categorical_done < numeric_started);
    }

    #[test]
    fn test_passthrough_cleaning_only_imputes() {
        let config = PipelineConfig {
            cleaning: CleaningConfig::passthrough(),
            ..Default::default()
        };
        let df = df![
            "department" => [Some("Sales"), None, Some("Sales"), Some("Sales")],
            "level" => [1i64, 1, 1, 1],
        ]
        .unwrap();

        let result = CleaningPipeline::builder()
            .config(config)
            .build()
            .unwrap()
            .process(df)
            .unwrap();

        assert_eq!(result.data.width(), 2);
        assert_eq!(result.data.column("department").unwrap().null_count(), 0);
    }

    #[test]
    fn test_failure_is_reported_to_progress() {
        let failed = Arc::new(AtomicUsize::new(0));
        let sink = failed.clone();
        let config = PipelineConfig {
            cleaning: CleaningConfig::passthrough(),
            ..Default::default()
        };
        // constant context column with a moderately incomplete target
        let df = df![
            "constant" => [3.0; 10],
            "y" => [Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), Some(6.0), Some(7.0), Some(8.0), Some(9.0), Some(10.0)],
        ]
        .unwrap();

        let err = CleaningPipeline::builder()
            .config(config)
            .on_progress(move |update| {
                if update.stage == PipelineStage::Failed {
                    sink.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap()
            .process(df)
            .unwrap_err();

        assert_eq!(err.error_code(), "DEGENERATE_VARIANCE");
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }
}
