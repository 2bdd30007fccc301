//! CLI entry point for the tabular cleansing pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use tabular_cleansing::service::{self, CleaningDelegate, LocalCleaner, PreprocessResponse};
use tabular_cleansing::{
    CleansingConfig, CleansingReport, ColumnClassifier, ColumnKind, MissingLabelPolicy,
    MissingValueStrategy, NormalizationMethod, OutlierPolicy, Pipeline, PreprocessRequest,
    RawTable, ReportGenerator, RequestConfig, io,
};
use tracing::{error, info, warn};

#[cfg(feature = "remote")]
use tabular_cleansing::service::RemoteCleaner;

/// Environment variable naming the remote cleaning endpoint.
const REMOTE_URL_ENV: &str = "CLEANSING_REMOTE_URL";

/// CLI-compatible outlier policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierPolicy {
    /// Replace out-of-bound cells with the interquartile midpoint until stable
    Replace,
    /// Remove rows holding any out-of-bound cell
    Drop,
}

impl From<CliOutlierPolicy> for OutlierPolicy {
    fn from(cli: CliOutlierPolicy) -> Self {
        match cli {
            CliOutlierPolicy::Replace => OutlierPolicy::Replace,
            CliOutlierPolicy::Drop => OutlierPolicy::Drop,
        }
    }
}

/// CLI-compatible normalization enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNormalization {
    /// (x - mean) / std
    Zscore,
    /// (x - min) / (max - min)
    Minmax,
}

impl From<CliNormalization> for NormalizationMethod {
    fn from(cli: CliNormalization) -> Self {
        match cli {
            CliNormalization::Zscore => NormalizationMethod::ZScore,
            CliNormalization::Minmax => NormalizationMethod::MinMax,
        }
    }
}

/// CLI-compatible missing value strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingValues {
    /// Fill missing numeric cells with the column mean
    Impute,
    /// Drop rows with a missing numeric feature or label
    DropRows,
}

impl From<CliMissingValues> for MissingValueStrategy {
    fn from(cli: CliMissingValues) -> Self {
        match cli {
            CliMissingValues::Impute => MissingValueStrategy::Impute,
            CliMissingValues::DropRows => MissingValueStrategy::DropRows,
        }
    }
}

/// CLI-compatible missing label policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMissingLabels {
    /// Keep rows without a label (reported as null labels)
    Keep,
    /// Drop rows without a label
    Drop,
}

impl From<CliMissingLabels> for MissingLabelPolicy {
    fn from(cli: CliMissingLabels) -> Self {
        match cli {
            CliMissingLabels::Keep => MissingLabelPolicy::Keep,
            CliMissingLabels::Drop => MissingLabelPolicy::Drop,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cleansing pipeline for tabular training data",
    long_about = "Cleans a CSV table for model training: mean imputation, IQR outlier \
                  resolution, standardization and categorical encoding.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  CLEANSING_REMOTE_URL    Endpoint of an external cleaning service\n\n\
                  EXAMPLES:\n  \
                  # Clean a file, last column is the label\n  \
                  tabular-cleansing -i train.csv\n\n  \
                  # Named label, drop outlier rows, min-max scaling\n  \
                  tabular-cleansing -i train.csv --label species --outlier-policy drop --normalization minmax\n\n  \
                  # Preview classification without cleaning\n  \
                  tabular-cleansing -i train.csv --dry-run\n\n  \
                  # Service mode: JSON request on stdin, JSON response on stdout\n  \
                  tabular-cleansing --request - < request.json"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long, required_unless_present = "request")]
    input: Option<String>,

    /// Output directory for results
    #[arg(short, long, default_value = "./output")]
    output: String,

    /// Output file name (without extension)
    ///
    /// The cleaned dataset is written as <name>.csv and the report as
    /// <name>_report.json. Defaults to "cleaned_dataset".
    #[arg(long)]
    output_name: Option<String>,

    /// The input has no header row (columns are named column_1..n)
    #[arg(long)]
    no_header: bool,

    /// Label column (defaults to the last column)
    #[arg(long)]
    label: Option<String>,

    /// Policy for out-of-bound numeric cells
    #[arg(long, value_enum, default_value = "replace")]
    outlier_policy: CliOutlierPolicy,

    /// Rescaling of numeric feature columns
    #[arg(long, value_enum, default_value = "zscore")]
    normalization: CliNormalization,

    /// Handling of missing numeric cells
    #[arg(long, value_enum, default_value = "impute")]
    missing_values: CliMissingValues,

    /// Handling of rows with a missing label
    #[arg(long, value_enum, default_value = "keep")]
    missing_labels: CliMissingLabels,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON is written.
    #[arg(long)]
    json: bool,

    /// Write the JSON report next to the cleaned dataset
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Service mode: read a JSON request from a file (or '-' for stdin)
    ///
    /// Writes the JSON response to stdout.
    #[arg(long, value_name = "FILE|-")]
    request: Option<String>,

    /// Forward cleaning to an external service at this URL
    ///
    /// Falls back to CLEANSING_REMOTE_URL from the environment or .env.
    #[arg(long)]
    remote: Option<String>,

    /// Classify the input and preview the run without cleaning
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// JSON.
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
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Service mode always answers in JSON
    init_logging(&args.log_level, args.quiet, args.json || args.request.is_some());

    dotenv().ok();

    let config = build_config(&args)?;
    let remote_url = args.remote.clone().or_else(|| env::var(REMOTE_URL_ENV).ok());

    if let Some(ref source) = args.request {
        let delegate = make_delegate(remote_url.as_deref(), config)?;
        return run_request(source, delegate.as_ref());
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input is required unless --request is given"))?;
    if !Path::new(input).exists() {
        return Err(anyhow!("Input file not found: {}", input));
    }

    info!("Loading dataset from: {}", input);
    let raw = io::read_csv_file(input, config.has_header)?;
    info!("Dataset loaded: {} rows x {} columns", raw.height(), raw.width());

    if args.dry_run {
        return run_dry_run(&args, input, &raw, &config);
    }

    if let Some(url) = remote_url {
        return run_remote_file(&args, input, url, config);
    }

    run_pipeline(&args, input, raw, config)
}

fn build_config(args: &Args) -> Result<CleansingConfig> {
    let mut builder = CleansingConfig::builder()
        .output_dir(&args.output)
        .has_header(!args.no_header)
        .outlier_policy(args.outlier_policy.into())
        .normalization(args.normalization.into())
        .missing_values(args.missing_values.into())
        .missing_labels(args.missing_labels.into());

    if let Some(ref name) = args.output_name {
        builder = builder.output_name(name);
    }
    if let Some(ref label) = args.label {
        builder = builder.label_column(label);
    }

    Ok(builder.build()?)
}

/// Pick the cleaning delegate: remote when a URL is known, local otherwise.
#[cfg(feature = "remote")]
fn make_delegate(
    remote_url: Option<&str>,
    config: CleansingConfig,
) -> Result<Box<dyn CleaningDelegate>> {
    match remote_url {
        Some(url) => {
            info!("Forwarding requests to {}", url);
            Ok(Box::new(RemoteCleaner::new(url)?))
        }
        None => Ok(Box::new(LocalCleaner::new(config))),
    }
}

#[cfg(not(feature = "remote"))]
fn make_delegate(
    remote_url: Option<&str>,
    config: CleansingConfig,
) -> Result<Box<dyn CleaningDelegate>> {
    if remote_url.is_some() {
        warn!("Remote support not compiled in. Cleaning locally.");
        warn!("Compile with --features remote to enable the remote delegate.");
    }
    Ok(Box::new(LocalCleaner::new(config)))
}

/// Service mode: read a request, print the response.
fn run_request(source: &str, delegate: &dyn CleaningDelegate) -> Result<()> {
    let body = if source == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        body
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| anyhow!("Could not read request file {}: {}", source, e))?
    };

    let response = service::handle_json(delegate, &body);
    println!("{}", serde_json::to_string(&response)?);

    match response {
        PreprocessResponse::Success(_) => Ok(()),
        PreprocessResponse::Failure(failure) => Err(anyhow!("Request failed: {}", failure.error)),
    }
}

/// Send a local file to the remote service and show its report.
fn run_remote_file(args: &Args, input: &str, url: String, config: CleansingConfig) -> Result<()> {
    let csv_content = std::fs::read_to_string(input)?;
    let request = PreprocessRequest::new(csv_content).with_config(RequestConfig {
        include_data: Some(false),
        ..RequestConfig::from_config(&config)
    });

    let delegate = make_delegate(Some(&url), config)?;
    match service::handle_request(delegate.as_ref(), &request) {
        PreprocessResponse::Success(output) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&output.report)?);
            } else {
                print_human_readable_summary(&output.report, input, None, None, args);
            }
            Ok(())
        }
        PreprocessResponse::Failure(failure) => {
            error!("Remote cleaning failed: {}", failure.error);
            if let Some(details) = &failure.details {
                error!("Details: {}", details);
            }
            Err(anyhow!("Remote cleaning failed: {}", failure.error))
        }
    }
}

/// Run the pipeline and write results.
fn run_pipeline(args: &Args, input: &str, raw: RawTable, config: CleansingConfig) -> Result<()> {
    let shape = (raw.height(), raw.width());
    let generator = ReportGenerator::from_config(&config);

    let mut builder = Pipeline::builder().config(config);
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

    let result = match builder.build()?.process(raw) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    let dataset_path = generator.write_dataset(&result.table)?;
    let dataset = dataset_path.to_string_lossy().to_string();
    let report = ReportGenerator::build_report(Some(input), Some(&dataset), &result.report);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let report_path = if args.emit_report {
        let path = generator.write_report_to_file(&report)?;
        info!("Report written to: {}", path.display());
        Some(path)
    } else {
        None
    };

    print_human_readable_summary(
        &result.report,
        input,
        Some((shape, &dataset_path)),
        report_path.as_deref(),
        args,
    );
    if result.report.samples == 0 {
        warn!("No rows left after cleansing; the dataset is not ready for training");
    }
    Ok(())
}

/// Preview classification and the planned run without cleaning.
///
/// Uses `println!` on purpose: the preview is the command's output.
fn run_dry_run(args: &Args, input: &str, raw: &RawTable, config: &CleansingConfig) -> Result<()> {
    let classification = ColumnClassifier::classify(raw, config)?;
    let table = &classification.table;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of the cleansing run");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input);
    println!("  Rows: {}", raw.height());
    println!("  Columns: {}", raw.width());
    println!("  Header row: {}", if config.has_header { "yes" } else { "no" });
    println!();

    println!("COLUMN CLASSIFICATION");
    println!("{}", "-".repeat(40));
    println!("{:<24} {:<12} {:<10} {:<10}", "Column", "Kind", "Missing", "Distinct");
    println!("{}", "-".repeat(60));
    for (idx, spec) in table.columns().iter().enumerate() {
        let distinct = match spec.kind {
            ColumnKind::Categorical => {
                let mut values: Vec<&str> =
                    table.column_cells(idx).filter_map(|c| c.as_text()).collect();
                values.sort_unstable();
                values.dedup();
                values.len().to_string()
            }
            _ => "-".to_string(),
        };
        println!(
            "{:<24} {:<12} {:<10} {:<10}",
            truncate_str(&spec.name, 23),
            spec.kind.as_str(),
            table.missing_count(idx),
            distinct
        );
    }
    println!();

    if classification.malformed_cells > 0 {
        println!(
            "  {} malformed cell(s) in numeric columns will be treated as missing",
            classification.malformed_cells
        );
        println!();
    }

    println!("PLANNED STAGES");
    println!("{}", "-".repeat(40));
    println!("  1. Missing values: {}", config.missing_values.as_str());
    println!("  2. Missing labels: {}", config.missing_labels.as_str());
    println!("  3. Outliers (IQR x 1.5): {}", config.outlier_policy.as_str());
    println!("  4. Normalization: {}", config.normalization.as_str());
    println!("  5. Categorical encoding (first-seen order)");
    println!();

    let generator = ReportGenerator::from_config(config);
    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    println!("  - {}", generator.dataset_path().display());
    if args.emit_report {
        println!("  - {}", generator.report_path().display());
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute this run, drop --dry-run");
    println!("{}", "=".repeat(80));

    Ok(())
}

/// Truncate a string to `max_len` characters with an ellipsis.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a human-readable summary of the run.
fn print_human_readable_summary(
    report: &CleansingReport,
    input: &str,
    local: Option<((usize, usize), &PathBuf)>,
    report_path: Option<&Path>,
    args: &Args,
) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANSING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    match local {
        Some(((rows, cols), dataset)) => {
            println!("Input:  {} ({} rows x {} columns)", input, rows, cols);
            println!("Output: {} ({} rows)", dataset.display(), report.samples);
        }
        None => println!("Input:  {} (cleaned remotely)", input),
    }
    if let Some(path) = report_path {
        println!("Report: {}", path.display());
    }
    println!();

    println!("Summary:");
    println!("  Samples: {}", report.samples);
    println!("  Features: {}", report.features);
    println!("  Missing filled: {}", report.missing_filled);
    println!(
        "  Outliers removed: {} ({})",
        report.outliers_removed,
        report.outlier_policy.as_str()
    );
    println!("  Normalization: {}", report.normalization.as_str());
    if report.rows_dropped > 0 {
        println!("  Rows dropped: {}", report.rows_dropped);
    }
    println!("  Ready: {}", report.ready);
    println!();

    if !report.categorical_mappings.is_empty() {
        println!("Categorical Mappings:");
        for (column, mapping) in &report.categorical_mappings {
            let preview: Vec<String> = mapping
                .iter()
                .take(5)
                .map(|(value, code)| format!("{}={}", value, code))
                .collect();
            let more = if mapping.len() > 5 { ", ..." } else { "" };
            println!("  {}: {}{}", column, preview.join(", "), more);
        }
        println!();
    }

    let mut warnings = Vec::new();
    if report.missing_labels > 0 {
        warnings.push(format!("{} row(s) had no label", report.missing_labels));
    }
    if report.malformed_cells > 0 {
        warnings.push(format!(
            "{} malformed numeric cell(s) were treated as missing",
            report.malformed_cells
        ));
    }
    if !report.skipped_columns.is_empty() {
        warnings.push(format!(
            "Skipped column(s) without values: {}",
            report.skipped_columns.join(", ")
        ));
    }
    if !warnings.is_empty() {
        println!("Warnings:");
        for warning in &warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    if !args.emit_report {
        println!("Use --emit-report to save the JSON report");
    }
    println!("{}", "=".repeat(80));
}
