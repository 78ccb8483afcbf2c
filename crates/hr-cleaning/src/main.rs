//! CLI entry point for the HR cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use hr_cleaning::io::{read_csv, write_csv};
use hr_cleaning::{
    CleaningPipeline, CleaningReport, NumericStrategy, PipelineConfig, PipelineResult, ReportWriter,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Clean and impute a raw HR export",
    long_about = "Cleans a raw human-resources CSV export: removes duplicates and \
                  uninformative columns, normalizes text, coerces types, relabels \
                  ordinal codes and imputes missing values.\n\n\
                  EXAMPLES:\n  \
                  # Defaults\n  \
                  hr-cleaning -i data/raw_hr.csv -o output/hr_processed.csv\n\n  \
                  # Custom configuration with a JSON report next to the CSV\n  \
                  hr-cleaning -i data/raw_hr.csv --config cleaning.json --emit-report\n\n  \
                  # Machine-readable summary\n  \
                  hr-cleaning -i data/raw_hr.csv --json | jq .summary.imputation"
)]
struct Args {
    /// Path to the raw CSV export
    #[arg(short, long)]
    input: PathBuf,

    /// Path of the cleaned CSV
    #[arg(short, long, default_value = "output/hr_processed.csv")]
    output: PathBuf,

    /// JSON configuration file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Row identifier column, kept aside during cleaning
    #[arg(long)]
    id_column: Option<String>,

    /// Text columns to keep out of categorical imputation (comma separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Number of donor rows for neighbor imputation
    #[arg(long)]
    neighbors: Option<usize>,

    /// Do not add `<column>_missing` indicators for highly incomplete columns
    #[arg(long)]
    no_missing_indicator: bool,

    /// Use neighbor imputation for highly incomplete columns instead of the median
    #[arg(long)]
    neighbors_for_high_missing: bool,

    /// Write a JSON report next to the cleaned CSV
    ///
    /// The report will be saved as <output_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Print the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all logs so stdout carries only JSON.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings, errors and the final result
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let config = build_config(&args)?;
    let pipeline = build_pipeline(&args, config)?;

    info!("Loading dataset from: {}", args.input.display());
    let data = read_csv(&args.input)?;

    let mut result = match pipeline.process(data) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed [{}]: {}", e.error_code(), e));
        }
    };

    write_csv(&mut result.data, &args.output)
        .with_context(|| format!("Failed to export {}", args.output.display()))?;

    handle_output(&result, &args)
}

/// Load the configuration file, if any, and apply flag overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let base = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineConfig::builder().base(base);

    if let Some(id) = &args.id_column {
        builder = builder.id_column(Some(id.clone()));
    }
    if !args.exclude.is_empty() {
        builder = builder.categorical_exclude(args.exclude.clone());
    }
    if let Some(k) = args.neighbors {
        builder = builder.neighbor_count(k);
    }
    if args.no_missing_indicator {
        builder = builder.add_missing_indicator(false);
    }
    if args.neighbors_for_high_missing {
        builder = builder.use_neighbor_imputation_for_high_missing(true);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<CleaningPipeline> {
    let mut builder = CleaningPipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

fn handle_output(result: &PipelineResult, args: &Args) -> Result<()> {
    let report = CleaningReport::new(&args.input, Some(&args.output), result.summary.clone());

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = ReportWriter::new().write_next_to(&report, &args.output)?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report);
    Ok(())
}

/// Uses `println!` on purpose: the summary is the command's result, not a log.
fn print_human_readable_summary(report: &CleaningReport) {
    let summary = &report.summary;
    let imputation = &summary.imputation;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, summary.rows_before, summary.columns_before
    );
    if let Some(output_file) = &report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, summary.rows_after, summary.columns_after
        );
    }
    println!("Duration: {}ms", summary.duration_ms);
    println!();

    if !summary.cleaning_actions.is_empty() {
        println!("Actions Taken:");
        for action in &summary.cleaning_actions {
            println!("  - {}", action);
        }
        println!();
    }

    println!("Categorical Imputation:");
    for outcome in &imputation.categorical.outcomes {
        println!(
            "  {:<28} {:>5.1}% missing  {}",
            outcome.column,
            outcome.missing_ratio * 100.0,
            outcome.strategy
        );
    }
    println!();

    println!("Numeric Imputation:");
    for outcome in &imputation.numeric.outcomes {
        if outcome.strategy == NumericStrategy::Complete {
            continue;
        }
        println!(
            "  {:<28} {:>5.1}% missing  {}",
            outcome.column,
            outcome.missing_ratio * 100.0,
            outcome.strategy
        );
    }
    let indicators = imputation.numeric.indicators();
    if !indicators.is_empty() {
        println!("  Indicators added: {}", indicators.join(", "));
    }
    println!();

    println!(
        "Remaining missing: {} categorical, {} numeric",
        summary.remaining_missing_categorical, summary.remaining_missing_numeric
    );
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save a JSON report next to the CSV");
    println!("{}", "=".repeat(80));
}
