//! CLI entry point for the layoff cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use layoff_cleaning::schema::{EVENT_DATE, retype_iso_event_dates};
use layoff_cleaning::{
    CleaningConfig, CleaningReport, OutputFormat, Pipeline, QualityIssueKind, ReportGenerator,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// CLI-compatible output format enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Apache Parquet
    Parquet,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(cli: CliOutputFormat) -> Self {
        match cli {
            CliOutputFormat::Csv => OutputFormat::Csv,
            CliOutputFormat::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Batch cleaning job for company layoff records",
    long_about = "Deduplicates, standardizes and backfills a layoff records extract.\n\n\
                  EXAMPLES:\n  \
                  # Clean an extract into ./outputs/layoffs_cleaned.csv\n  \
                  layoff-cleaning -i layoffs.csv\n\n  \
                  # Preview what would change\n  \
                  layoff-cleaning -i layoffs.csv --dry-run\n\n  \
                  # Custom rules and a JSON run report\n  \
                  layoff-cleaning -i layoffs.csv --config rules.json --emit-report"
)]
struct Args {
    /// Path to the extract (CSV, or Parquet by extension)
    #[arg(short, long)]
    input: String,

    /// Output directory for the cleaned relation and reports [default: outputs]
    #[arg(short, long)]
    output: Option<String>,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "layoffs_cleaned"
    #[arg(long)]
    output_name: Option<String>,

    /// JSON file with cleaning rules (fields not given keep their defaults)
    #[arg(long)]
    config: Option<String>,

    /// Output format of the cleaned relation
    #[arg(long, value_enum)]
    format: Option<CliOutputFormat>,

    /// Preview what the pipeline will change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Leave null industries alone instead of copying them from siblings
    #[arg(long)]
    no_backfill: bool,

    /// Keep rows that have neither layoff measure
    #[arg(long)]
    keep_uninformative: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON report (or error) is printed.
    #[arg(long)]
    json: bool,

    /// Write a JSON run report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Input is a previous cleaned output: read ISO `YYYY-MM-DD` event dates
    /// as dates instead of reparsing them as `M/D/YYYY`
    #[arg(long)]
    cleaned_input: bool,
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

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input);
    let data = load_source(&args.input, args.cleaned_input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let pipeline = build_pipeline(&args, config)?;

    if args.dry_run {
        return run_dry_run(&pipeline, &args, &data);
    }

    run_pipeline(&pipeline, &args, &data)
}

/// Merge the optional config file with CLI overrides.
fn build_config(args: &Args) -> Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading cleaning rules from: {}", path);
            CleaningConfig::from_json_file(path)?
        }
        None => CleaningConfig::default(),
    };

    if let Some(ref output) = args.output {
        config.output_dir = PathBuf::from(output);
    }
    if let Some(ref name) = args.output_name {
        config.output_name = Some(name.clone());
    }
    if let Some(format) = args.format {
        config.output_format = format.into();
    }
    if args.no_backfill {
        config.backfill_industry = false;
    }
    if args.keep_uninformative {
        config.remove_uninformative = false;
    }
    config.save_to_disk = !args.dry_run;

    config.validate()?;
    debug!("Effective config: {:?}", config);
    Ok(config)
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet {
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

/// Run dry-run mode - show what would happen without writing anything.
///
/// Uses `println!` for user-facing output so it shows regardless of log level.
fn run_dry_run(pipeline: &Pipeline, args: &Args, data: &DataFrame) -> Result<()> {
    let preview = pipeline.preview(data)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of cleaning actions");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Rows: {}", preview.rows);
    println!("  Columns: {}", data.width());
    if !preview.dropped_columns.is_empty() {
        println!("  Extra columns (dropped): {}", preview.dropped_columns.join(", "));
    }
    println!("  Null markers: {}", preview.null_markers_replaced);
    if preview.unparseable_measures > 0 {
        println!("  Non-numeric measures: {}", preview.unparseable_measures);
    }
    println!();

    let config = pipeline.config();
    println!("PROPOSED ACTIONS");
    println!("{}", "-".repeat(40));
    println!(
        "  1. Remove {} duplicate rows",
        preview.count(QualityIssueKind::DuplicateRows)
    );
    println!(
        "  2. Trim {} company names",
        preview.count(QualityIssueKind::UntrimmedCompany)
    );
    println!(
        "  3. Canonicalize {} industries",
        preview.count(QualityIssueKind::NonCanonicalIndustry)
    );
    println!(
        "  4. Strip trailing periods from {} countries",
        preview.count(QualityIssueKind::CountryTrailingPeriod)
    );
    println!(
        "  5. Type event date ({} values will not parse and become null)",
        preview.count(QualityIssueKind::UnparseableDate)
    );
    if config.backfill_industry {
        println!(
            "  6. Backfill up to {} industries from (company, location) siblings",
            preview.count(QualityIssueKind::BackfillableIndustry)
        );
    }
    if config.remove_uninformative {
        println!(
            "  7. Remove up to {} rows without layoff measures",
            preview.count(QualityIssueKind::UninformativeRows)
        );
    }
    println!();

    let samples: Vec<_> = preview.issues.iter().filter(|i| !i.samples.is_empty()).collect();
    if !samples.is_empty() {
        println!("SAMPLE VALUES");
        println!("{}", "-".repeat(40));
        for issue in samples {
            println!("  {}: {:?}", issue.kind.display_name(), issue.samples);
        }
        println!();
    }

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    println!("  - {}", ReportGenerator::from_config(config).output_path().display());
    if args.emit_report {
        println!(
            "  - {}/{}_report.json",
            config.output_dir.display(),
            extract_file_stem(&args.input)
        );
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute this cleaning, run without --dry-run");
    println!("{}", "=".repeat(80));

    Ok(())
}

/// Run pipeline and print results
fn run_pipeline(pipeline: &Pipeline, args: &Args, data: &DataFrame) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting layoff cleaning pipeline...");
    info!("{}", "=".repeat(80));

    let result = match pipeline.process(data) {
        Ok(result) => result,
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    let report = ReportGenerator::build_report(&args.input, &result);

    if args.emit_report {
        let generator = ReportGenerator::from_config(pipeline.config());
        let report_path =
            generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report, data.shape());

    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning results.
fn print_human_readable_summary(report: &CleaningReport, original_shape: (usize, usize)) {
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, original_shape.0, original_shape.1
    );
    if let Some(ref output_file) = report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file,
            summary.rows_after,
            report.column_types.len()
        );
    }
    println!();

    println!("Cleaning Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.1}%)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed(),
        report.rows_removed_percent
    );
    println!("  Duplicates removed: {}", summary.duplicates_removed);
    println!("  Company names trimmed: {}", summary.companies_trimmed);
    println!("  Industries canonicalized: {}", summary.industries_canonicalized);
    println!("  Country periods stripped: {}", summary.countries_trimmed);
    println!(
        "  Event dates: {} parsed, {} unparseable",
        summary.dates_parsed, summary.dates_unparseable
    );
    println!(
        "  Industries backfilled: {} ({} still null)",
        summary.industries_backfilled, summary.industries_unresolved
    );
    println!(
        "  Rows without measures removed: {}",
        summary.uninformative_removed
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
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

/// Load the extract with every column as text.
///
/// Schema inference is disabled so the `NULL` markers and `M/D/YYYY` dates
/// reach the pipeline untouched. With `cleaned_input`, an all-ISO event date
/// column (as written by a previous run) is typed back to `Date`.
fn load_source(path: &str, cleaned_input: bool) -> Result<DataFrame> {
    let is_parquet = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        let file = std::fs::File::open(path)?;
        return Ok(ParquetReader::new(file).finish()?);
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()?;

    if cleaned_input && df.column(EVENT_DATE).is_ok() && retype_iso_event_dates(&mut df)? {
        debug!("Event dates read as ISO from cleaned input");
    }

    Ok(df)
}
