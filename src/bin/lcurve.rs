//! lcurve - Command-line interface for Launch Curve
//!
//! Commands:
//! - normalize: Turn a daily traffic report into launch-anchored curves
//! - validate: Check report rows and per-entity series
//! - summary: Print per-entity summaries and the cohort curve
//! - doctor: Diagnose configuration and environment
//! - config: Print the default configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use launch_curve::config::{BatchConfig, DateRange, FailurePolicy};
use launch_curve::encoder::{OutputFormat as EncodeFormat, ReportEncoder};
use launch_curve::normalizer::validate_series;
use launch_curve::schema::{parse_date, RowAdapter, TrafficRow, SCHEMA_VERSION};
use launch_curve::summary::{CohortCurve, EntitySummary};
use launch_curve::types::EntitySeries;
use launch_curve::{ComputeError, LaunchProcessor, PRODUCER_NAME, VERSION};

/// lcurve - Launch-anchored, gap-filled daily traffic curves
#[derive(Parser)]
#[command(name = "lcurve")]
#[command(version = VERSION)]
#[command(about = "Normalize daily traffic into days-since-launch curves", long_about = None)]
struct Cli {
    /// Increase log verbosity (debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a daily traffic report into per-entity curves
    Normalize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Validate report rows and per-entity series
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Sort each entity's rows by date before checking
        #[arg(long)]
        sort: bool,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print per-entity summaries and the cohort curve
    Summary {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[command(flatten)]
        batch: BatchArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

/// Batch configuration: a config file plus per-flag overrides
#[derive(clap::Args)]
struct BatchArgs {
    /// Load configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Launch day must record strictly more than this
    #[arg(long)]
    min_first_day_count: Option<u64>,

    /// Drop rows more than this many days after launch
    #[arg(long)]
    max_days_live: Option<u32>,

    /// Skip entities whose total traffic is below this
    #[arg(long)]
    min_total_count: Option<u64>,

    /// First day of the report window (YYYY-MM-DD)
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// Last day of the report window (YYYY-MM-DD)
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// What to do when an entity cannot be normalized
    #[arg(long)]
    on_failure: Option<FailureArg>,

    /// Worker threads for the per-entity fan-out
    #[arg(long)]
    workers: Option<usize>,

    /// Sort each entity's rows by date before normalizing
    #[arg(long)]
    sort: bool,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON array of rows
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per entity-day)
    Ndjson,
    /// JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

impl From<OutputFormat> for EncodeFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Ndjson => EncodeFormat::Ndjson,
            OutputFormat::Json => EncodeFormat::Json,
            OutputFormat::JsonPretty => EncodeFormat::JsonPretty,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum FailureArg {
    /// Skip the entity with a warning
    Skip,
    /// Abort the run
    Fail,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliErrorReport::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "launch_curve=debug,lcurve=debug"
    } else if quiet {
        "launch_curve=warn,lcurve=warn"
    } else {
        "launch_curve=info,lcurve=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Normalize {
            input,
            output,
            input_format,
            output_format,
            batch,
        } => cmd_normalize(&input, &output, input_format, output_format, &batch),

        Commands::Validate {
            input,
            input_format,
            sort,
            json,
        } => cmd_validate(&input, input_format, sort, json),

        Commands::Summary {
            input,
            input_format,
            batch,
            json,
        } => cmd_summary(&input, input_format, &batch, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Config => {
            println!("{}", BatchConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn cmd_normalize(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    batch: &BatchArgs,
) -> Result<(), CliError> {
    let config = build_config(batch)?;
    let entities = load_entities(input, input_format, &config, batch.sort)?;

    let processor = LaunchProcessor::new(config)?;
    let outcome = processor.process(&entities)?;

    if outcome.curves.is_empty() {
        return Err(CliError::NoCurves(outcome.entity_count()));
    }

    let encoder = ReportEncoder::new();
    tracing::info!(
        run_id = encoder.run_id(),
        curves = outcome.curves.len(),
        skipped = outcome.skipped.len(),
        excluded = outcome.excluded.len(),
        "normalization finished"
    );
    let output_data = encoder.encode(&outcome, processor.config(), output_format.into())?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    sort: bool,
    json: bool,
) -> Result<(), CliError> {
    let rows = read_rows(input, input_format)?;

    let mut errors: Vec<ValidationErrorDetail> = RowAdapter::validate_rows(&rows)
        .into_iter()
        .map(|r| ValidationErrorDetail {
            scope: format!("row {}", r.index + 1),
            entity: r.entity,
            error: r.error.to_string(),
        })
        .collect();

    // Series checks only make sense once every row parses.
    let mut entity_count = 0;
    if errors.is_empty() {
        let mut entities = RowAdapter::group_by_entity(&rows, None)?;
        entity_count = entities.len();
        for series in &mut entities {
            if sort {
                series.sort_by_date();
            }
            if let Err(e) = validate_series(&series.observations) {
                errors.push(ValidationErrorDetail {
                    scope: "series".to_string(),
                    entity: series.entity.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let report = ValidationReport {
        total_rows: rows.len(),
        entities: entity_count,
        invalid: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows: {}", report.total_rows);
        println!("Entities:   {}", report.entities);
        println!("Problems:   {}", report.invalid);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} ({}): {}", err.entity, err.scope, err.error);
            }
        }
    }

    if report.invalid > 0 {
        Err(CliError::ValidationFailed(report.invalid))
    } else {
        Ok(())
    }
}

fn cmd_summary(
    input: &Path,
    input_format: InputFormat,
    batch: &BatchArgs,
    json: bool,
) -> Result<(), CliError> {
    let config = build_config(batch)?;
    let entities = load_entities(input, input_format, &config, batch.sort)?;
    let outcome = LaunchProcessor::new(config)?.process(&entities)?;

    if outcome.curves.is_empty() {
        return Err(CliError::NoCurves(outcome.entity_count()));
    }

    let summaries: Vec<EntitySummary> = outcome
        .curves
        .iter()
        .map(EntitySummary::from_curve)
        .collect();
    let cohort = CohortCurve::from_curves(&outcome.curves);

    if json {
        let report = SummaryReport {
            entities: summaries,
            cohort,
            skipped: outcome.skipped.len(),
            excluded: outcome.excluded.len(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Entity Summaries");
    println!("================");
    for s in &summaries {
        println!(
            "  {}: launched {} | {} days | total {} | launch day {} ({:.0}%) | peak {} on day {}",
            s.entity,
            s.launch_date,
            s.days_covered,
            s.total_count,
            s.launch_day_count,
            s.launch_day_share * 100.0,
            s.peak_count,
            s.peak_days_live
        );
    }
    if !outcome.skipped.is_empty() || !outcome.excluded.is_empty() {
        println!(
            "\nSkipped: {}  Excluded (low volume): {}",
            outcome.skipped.len(),
            outcome.excluded.len()
        );
    }

    println!("\nCohort Curve");
    println!("============");
    println!("  day  entities  mean/day  mean total  median total");
    for p in &cohort.points {
        println!(
            "  {:>3}  {:>8}  {:>8.1}  {:>10.1}  {:>12.1}",
            p.days_live, p.entities, p.mean_count, p.mean_cumulative, p.median_cumulative
        );
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "version".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} {}", PRODUCER_NAME, VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(config_path) = config {
        let check = if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match BatchConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (threshold {}, horizon {} days)",
                            cfg.normalizer.min_first_day_count, cfg.normalizer.max_days_live
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        } else {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        };
        checks.push(check);
    }

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (pass --input <file>)".to_string()
        } else {
            "stdin is a pipe (--input - ready)".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("lcurve Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error))
    {
        Err(CliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn build_config(args: &BatchArgs) -> Result<BatchConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::from_json(&fs::read_to_string(path)?)?,
        None => BatchConfig::default(),
    };

    if let Some(v) = args.min_first_day_count {
        config.normalizer.min_first_day_count = v;
    }
    if let Some(v) = args.max_days_live {
        config.normalizer.max_days_live = v;
    }
    if let Some(v) = args.min_total_count {
        config.min_total_count = v;
    }
    if let (Some(start), Some(end)) = (&args.start, &args.end) {
        config.date_range = Some(DateRange::new(parse_date(start)?, parse_date(end)?)?);
    }
    if let Some(policy) = &args.on_failure {
        config.on_failure = match policy {
            FailureArg::Skip => FailurePolicy::Skip,
            FailureArg::Fail => FailurePolicy::FailRun,
        };
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }

    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, CliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_rows(input: &Path, input_format: InputFormat) -> Result<Vec<TrafficRow>, CliError> {
    let input_data = read_input(input)?;
    let rows = match input_format {
        InputFormat::Ndjson => RowAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RowAdapter::parse_array(&input_data)?,
    };
    if rows.is_empty() {
        return Err(CliError::NoRows);
    }
    Ok(rows)
}

fn load_entities(
    input: &Path,
    input_format: InputFormat,
    config: &BatchConfig,
    sort: bool,
) -> Result<Vec<EntitySeries>, CliError> {
    let rows = read_rows(input, input_format)?;
    let mut entities = RowAdapter::group_by_entity(&rows, config.date_range.as_ref())?;
    if sort {
        entities.iter_mut().for_each(EntitySeries::sort_by_date);
    }
    tracing::debug!(rows = rows.len(), entities = entities.len(), "loaded report");
    Ok(entities)
}

// Error types

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoRows,
    NoCurves(usize),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<ComputeError> for CliError {
    fn from(e: ComputeError) -> Self {
        CliError::Compute(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliErrorReport {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliError> for CliErrorReport {
    fn from(e: CliError) -> Self {
        match e {
            CliError::Io(e) => CliErrorReport {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::EntityFailed { .. } => (
                        "ENTITY_FAILED",
                        "Rerun with --on-failure skip to drop failing entities",
                    ),
                    ComputeError::ConfigError(_) => ("CONFIG_ERROR", "Run 'lcurve doctor --config <file>'"),
                    ComputeError::DateParseError(_) => {
                        ("DATE_ERROR", "Dates must be YYYY-MM-DD or YYYYMMDD")
                    }
                    _ => ("PARSE_ERROR", "Ensure input matches the traffic.daily_row.v1 schema"),
                };
                CliErrorReport {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliError::Json(e) => CliErrorReport {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliError::NoRows => CliErrorReport {
                code: "NO_ROWS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CliError::NoCurves(seen) => CliErrorReport {
                code: "NO_CURVES".to_string(),
                message: format!("None of {} entities produced a curve", seen),
                hint: Some(
                    "Lower --min-first-day-count or --min-total-count, or widen the date range"
                        .to_string(),
                ),
            },
            CliError::ValidationFailed(count) => CliErrorReport {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} problems found", count),
                hint: Some("Fix the listed rows, or pass --sort for unsorted series".to_string()),
            },
            CliError::DoctorFailed => CliErrorReport {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    entities: usize,
    invalid: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    scope: String,
    entity: String,
    error: String,
}

#[derive(serde::Serialize)]
struct SummaryReport {
    entities: Vec<EntitySummary>,
    cohort: CohortCurve,
    skipped: usize,
    excluded: usize,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
