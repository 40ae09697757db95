//! ACWR CLI - Command-line interface for ACWR Flux
//!
//! Commands:
//! - series: Compute workload ratio series per athlete
//! - report: Build the daily team risk report
//! - validate: Validate training records
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use acwr_flux::calendar::ReportingCalendar;
use acwr_flux::config::EngineConfig;
use acwr_flux::pipeline::TeamReporter;
use acwr_flux::records::{RawTrainingRecord, RecordAdapter};
use acwr_flux::types::WorkloadPoint;
use acwr_flux::{FLUX_VERSION, PRODUCER_NAME};

/// ACWR - Acute:Chronic Workload Ratio engine for athlete monitoring
#[derive(Parser)]
#[command(name = "acwr")]
#[command(author = "Synheart AI Inc")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn training logs into workload ratio series and risk reports", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the workload ratio series for each athlete in the input
    Series {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Only compute the series for this athlete
        #[arg(long)]
        athlete: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Build the daily team risk report from the latest point of each athlete
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,

        /// JSON array of athlete ids expected in the report
        #[arg(long)]
        roster: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Validate training records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Calendar-day policy used to check timestamps
        #[arg(long, default_value = "UTC")]
        timezone: String,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calendar-day policy, overrides the configuration (UTC, JST, or ±HH:MM)
    #[arg(long)]
    timezone: Option<String>,

    /// Evaluation time (RFC 3339), defaults to now
    #[arg(long)]
    now: Option<String>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one athlete series per line)
    Ndjson,
    /// JSON array of athlete series
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

/// `--verbose` wins, then `RUST_LOG`, then `warn`
fn log_directive(verbose: bool, rust_log: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    rust_log
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or("warn")
        .to_string()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let directive = log_directive(cli.verbose, std::env::var("RUST_LOG").ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AcwrCliError> {
    match cli.command {
        Commands::Series {
            input,
            output,
            input_format,
            output_format,
            athlete,
            engine,
        } => cmd_series(
            &input,
            &output,
            input_format,
            output_format,
            athlete.as_deref(),
            &engine,
        ),

        Commands::Report {
            input,
            output,
            input_format,
            pretty,
            roster,
            engine,
        } => cmd_report(&input, &output, input_format, pretty, roster.as_deref(), &engine),

        Commands::Validate {
            input,
            input_format,
            timezone,
            json,
        } => cmd_validate(&input, input_format, &timezone, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

/// Per-athlete series as written by `series`
#[derive(serde::Serialize)]
struct AthleteSeries {
    user_id: String,
    points: Vec<WorkloadPoint>,
}

fn cmd_series(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    athlete: Option<&str>,
    engine: &EngineArgs,
) -> Result<(), AcwrCliError> {
    let config = load_config(engine)?;
    let calculator = config.calculator()?;
    let now = evaluation_time(engine.now.as_deref())?;

    let raw = read_records(input, &input_format)?;
    let records = RecordAdapter::to_records(&raw, &calculator.calendar())?;
    if records.is_empty() {
        return Err(AcwrCliError::NoRecords);
    }

    let mut all_series = Vec::new();
    for (user_id, records) in RecordAdapter::group_by_athlete(records) {
        if athlete.is_some_and(|wanted| wanted != user_id) {
            continue;
        }
        let points = calculator.compute(&records, now);
        debug!(user_id = %user_id, points = points.len(), "series computed");
        all_series.push(AthleteSeries { user_id, points });
    }

    if let (Some(wanted), true) = (athlete, all_series.is_empty()) {
        return Err(AcwrCliError::UnknownAthlete(wanted.to_string()));
    }

    let output_data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for series in &all_series {
                lines.push(serde_json::to_string(series)?);
            }
            lines.join("\n") + "\n"
        }
        OutputFormat::Json => serde_json::to_string(&all_series)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&all_series)?,
    };

    write_output(output, &output_data)
}

fn cmd_report(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    pretty: bool,
    roster: Option<&Path>,
    engine: &EngineArgs,
) -> Result<(), AcwrCliError> {
    let config = load_config(engine)?;
    let reporter = TeamReporter::new(config)?;
    let now = evaluation_time(engine.now.as_deref())?;

    let roster: Vec<String> = match roster {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Vec::new(),
    };

    let raw = read_records(input, &input_format)?;
    let records = RecordAdapter::to_records(&raw, &reporter.calendar())?;
    let report = reporter.report(records, &roster, now);

    if report.summary.needs_attention() {
        info!(report_id = %report.producer.report_id, "report contains alerts");
    }

    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    write_output(output, &output_data)
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    timezone: &str,
    json: bool,
) -> Result<(), AcwrCliError> {
    let calendar = ReportingCalendar::parse(timezone)?;
    let records = read_records(input, &input_format)?;
    let results = RecordAdapter::validate_records(&records, &calendar);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                record_id: r.record_id.clone(),
                error: r
                    .issues
                    .iter()
                    .map(|issue| issue.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (index {}): {}",
                    err.record_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(AcwrCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), AcwrCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, FLUX_VERSION),
    });

    match config {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        }),
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => match EngineConfig::from_json(&content) {
                Ok(config) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid ({}d acute / {}d chronic, timezone {})",
                        config.window.acute_days, config.window.chronic_days, config.timezone
                    ),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid config: {}", e),
                }),
            },
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            }),
        },
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults (7d acute / 28d chronic, UTC)".to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass records with --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("ACWR Doctor Report");
        println!("==================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(AcwrCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn load_config(engine: &EngineArgs) -> Result<EngineConfig, AcwrCliError> {
    let mut config = match &engine.config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(timezone) = &engine.timezone {
        config.timezone = timezone.clone();
    }
    config.validate()?;
    Ok(config)
}

fn evaluation_time(now: Option<&str>) -> Result<DateTime<Utc>, AcwrCliError> {
    match now {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AcwrCliError::ParseError(format!("Invalid --now {:?}: {}", s, e))),
    }
}

fn read_records(
    input: &Path,
    input_format: &InputFormat,
) -> Result<Vec<RawTrainingRecord>, AcwrCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = match input_format {
        InputFormat::Ndjson => RecordAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => RecordAdapter::parse_array(&input_data)?,
    };
    debug!(records = records.len(), "read training records");
    Ok(records)
}

fn write_output(output: &Path, data: &str) -> Result<(), AcwrCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error handling

#[derive(Debug)]
enum AcwrCliError {
    Io(io::Error),
    Compute(acwr_flux::ComputeError),
    Json(serde_json::Error),
    NoRecords,
    UnknownAthlete(String),
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for AcwrCliError {
    fn from(e: io::Error) -> Self {
        AcwrCliError::Io(e)
    }
}

impl From<acwr_flux::ComputeError> for AcwrCliError {
    fn from(e: acwr_flux::ComputeError) -> Self {
        AcwrCliError::Compute(e)
    }
}

impl From<serde_json::Error> for AcwrCliError {
    fn from(e: serde_json::Error) -> Self {
        AcwrCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AcwrCliError> for CliError {
    fn from(e: AcwrCliError) -> Self {
        match e {
            AcwrCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AcwrCliError::Compute(e) => CliError {
                code: "INPUT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'acwr validate' for details".to_string()),
            },
            AcwrCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AcwrCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No training records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            AcwrCliError::UnknownAthlete(id) => CliError {
                code: "UNKNOWN_ATHLETE".to_string(),
                message: format!("No training records for athlete {}", id),
                hint: Some("Check the --athlete value against user_id in the input".to_string()),
            },
            AcwrCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            AcwrCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            AcwrCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Use an RFC 3339 timestamp, e.g. 2025-01-31T06:00:00Z".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    record_id: Option<String>,
    error: String,
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
