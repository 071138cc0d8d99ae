//! Trajecto CLI - Command-line interface for Trajecto
//!
//! Commands:
//! - process: Estimate displacement and clean the position track of a capture
//! - frequency: Print the sampling rate of a capture's acceleration stream
//! - validate: Check a capture directory at the load boundary
//! - doctor: Diagnose version and configuration health

use clap::{Parser, Subcommand};
use log::{debug, Level};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use trajecto::capture::{CaptureLoader, DEVICE_FILE, LOCATION_FILE};
use trajecto::config::PipelineConfig;
use trajecto::divergence::DivergenceFilter;
use trajecto::frequency::FrequencyEstimator;
use trajecto::pipeline::TrajectoryProcessor;
use trajecto::{TrajectoryError, PRODUCER_NAME, TRAJECTO_VERSION};

/// Trajecto - Trajectory estimation from smartphone sensor captures
#[derive(Parser)]
#[command(name = "trajecto")]
#[command(version = TRAJECTO_VERSION)]
#[command(about = "Estimate displacement and position tracks from phone sensor captures", long_about = None)]
struct Cli {
    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a capture directory into a report (and optionally a map)
    Process {
        /// Capture export directory
        #[arg(short, long)]
        input: PathBuf,

        /// Report output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Write an HTML map of the retained track
        #[arg(long)]
        map: Option<PathBuf>,

        /// Pipeline configuration (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Smoothing window in samples (odd)
        #[arg(long)]
        window: Option<usize>,

        /// Smoothing polynomial degree
        #[arg(long)]
        degree: Option<usize>,

        /// Leading position fixes inspected for divergence
        #[arg(long)]
        max_points: Option<usize>,

        /// Include per-step displacement and the full retained track
        #[arg(long)]
        full_series: bool,
    },

    /// Print the sampling rate of the acceleration stream
    Frequency {
        /// Capture export directory
        #[arg(short, long)]
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a capture directory
    Validate {
        /// Capture export directory
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline configuration (TOML) to validate against
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose version and configuration health
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Stderr logger; `RUST_LOG` overrides the default level
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let colored = atty::is(atty::Stream::Stderr);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .format(move |buf, record| {
            let time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            if !colored {
                return writeln!(buf, "{} {} [{}] {}", time, record.level(), record.target(), record.args());
            }
            let level_color = match record.level() {
                Level::Error => "\x1b[31m\x1b[1m",
                Level::Warn => "\x1b[33m\x1b[1m",
                Level::Info => "\x1b[32m\x1b[1m",
                Level::Debug => "\x1b[36m\x1b[1m",
                Level::Trace => "\x1b[90m\x1b[1m",
            };
            writeln!(
                buf,
                "{}{} {}\x1b[0m [{}] {}",
                time,
                level_color,
                record.level(),
                record.target(),
                record.args(),
            )
        })
        .init();
}

fn run(cli: Cli) -> Result<(), TrajectoCliError> {
    match cli.command {
        Commands::Process {
            input,
            output,
            map,
            config,
            window,
            degree,
            max_points,
            full_series,
        } => {
            let overrides = ConfigOverrides {
                window,
                degree,
                max_points,
                full_series,
            };
            cmd_process(&input, &output, map.as_deref(), config.as_deref(), overrides)
        }

        Commands::Frequency { input, json } => cmd_frequency(&input, json),

        Commands::Validate {
            input,
            config,
            json,
        } => cmd_validate(&input, config.as_deref(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

/// Command-line settings that take precedence over the configuration file
struct ConfigOverrides {
    window: Option<usize>,
    degree: Option<usize>,
    max_points: Option<usize>,
    full_series: bool,
}

fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<PipelineConfig, TrajectoCliError> {
    let mut config = match path {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(window) = overrides.window {
        config.smoothing.window = window;
    }
    if let Some(degree) = overrides.degree {
        config.smoothing.degree = degree;
    }
    if let Some(max_points) = overrides.max_points {
        config.divergence.max_points_to_check = max_points;
    }
    if overrides.full_series {
        config.full_series = true;
    }

    config.validate()?;
    Ok(config)
}

fn cmd_process(
    input: &Path,
    output: &Path,
    map: Option<&Path>,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<(), TrajectoCliError> {
    let config = load_config(config_path, &overrides)?;
    if log::log_enabled!(Level::Debug) {
        debug!("effective configuration:\n{}", config.to_toml_string()?);
    }

    let processor = TrajectoryProcessor::with_config(config)?;
    let processed = processor.process_dir(input)?;

    if let Some(map_path) = map {
        let html = processor.render_map(&processed)?;
        fs::write(map_path, html)?;
        debug!("map written to {}", map_path.display());
    }

    if output.to_string_lossy() == "-" {
        // Compact output when piped, pretty for a terminal
        let report = if atty::is(atty::Stream::Stdout) {
            processed.to_json()?
        } else {
            serde_json::to_string(&processed.report)?
        };
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", report)?;
        stdout.flush()?;
    } else {
        fs::write(output, processed.to_json()?)?;
    }

    Ok(())
}

fn cmd_frequency(input: &Path, json: bool) -> Result<(), TrajectoCliError> {
    let accel_path = CaptureLoader::find_acceleration_file(input)?;
    let acceleration = CaptureLoader::read_acceleration_csv(&fs::read_to_string(&accel_path)?)?;
    let stats = FrequencyEstimator::estimate_frequency(&acceleration.timestamps);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if stats.frequency_hz > 0.0 {
        println!("Sampling rate: {:.3} Hz", stats.frequency_hz);
        println!("Samples:       {}", stats.sample_count);
    } else {
        println!("Sampling rate: unknown");
        println!("Samples:       {}", stats.sample_count);
    }

    Ok(())
}

fn cmd_validate(input: &Path, config_path: Option<&Path>, json: bool) -> Result<(), TrajectoCliError> {
    let config = match config_path {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut checks: Vec<Check> = Vec::new();

    // Acceleration table
    match CaptureLoader::find_acceleration_file(input)
        .and_then(|path| Ok(fs::read_to_string(path)?))
        .and_then(|content| CaptureLoader::read_acceleration_csv(&content))
    {
        Ok(acceleration) => {
            let stats = FrequencyEstimator::estimate_frequency(&acceleration.timestamps);
            checks.push(Check::ok(
                "acceleration",
                format!("{} samples over {:.2} s", acceleration.len(), duration(&acceleration.timestamps)),
            ));

            checks.push(if stats.frequency_hz > 0.0 {
                Check::ok("sampling_rate", format!("{:.3} Hz", stats.frequency_hz))
            } else {
                Check::warning("sampling_rate", "Sampling rate could not be determined")
            });

            let window = config.smoothing.window;
            checks.push(if acceleration.len() >= window {
                Check::ok(
                    "smoothing_window",
                    format!("Window of {} fits {} samples", window, acceleration.len()),
                )
            } else {
                Check::error(
                    "smoothing_window",
                    format!("Need at least {} samples, got {}", window, acceleration.len()),
                )
            });
        }
        Err(e) => checks.push(Check::error("acceleration", e.to_string())),
    }

    // Position table
    match fs::read_to_string(input.join(LOCATION_FILE))
        .map_err(TrajectoryError::from)
        .and_then(|content| CaptureLoader::read_positions_csv(&content))
    {
        Ok(positions) => {
            checks.push(Check::ok("positions", format!("{} position fixes", positions.len())));

            let removed = DivergenceFilter::leading_divergent_count(&positions, &config.divergence);
            checks.push(if removed > 0 {
                Check::warning(
                    "leading_fixes",
                    format!("{} divergent leading fixes would be removed", removed),
                )
            } else {
                Check::ok("leading_fixes", "No divergent leading fixes")
            });
        }
        Err(e) => checks.push(Check::error("positions", e.to_string())),
    }

    // Device metadata (optional)
    let device_path = input.join(DEVICE_FILE);
    if device_path.is_file() {
        match fs::read_to_string(&device_path)
            .map_err(TrajectoryError::from)
            .and_then(|content| CaptureLoader::read_device_csv(&content))
        {
            Ok(device) => checks.push(Check::ok(
                "device",
                format!("{} metadata properties", device.properties().len()),
            )),
            Err(e) => checks.push(Check::warning("device", e.to_string())),
        }
    } else {
        checks.push(Check::warning("device", "No device metadata"));
    }

    let error_count = checks
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::Error))
        .count();

    let report = ValidationReport {
        input: input.display().to_string(),
        valid: error_count == 0,
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Input: {}", report.input);
        println!();
        print_checks(&report.checks);
    }

    if error_count > 0 {
        Err(TrajectoCliError::ValidationFailed(error_count))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), TrajectoCliError> {
    let mut checks: Vec<Check> = vec![Check::ok(
        "trajecto_version",
        format!("Trajecto version {}", TRAJECTO_VERSION),
    )];

    // Check configuration file if provided
    match config_path {
        Some(path) if !path.exists() => {
            checks.push(Check::warning("config", "Configuration file does not exist"));
        }
        Some(path) => match PipelineConfig::load_from_file(path) {
            Ok(config) => checks.push(Check::ok(
                "config",
                format!(
                    "Configuration valid (window {}, degree {}, {} leading fixes checked)",
                    config.smoothing.window,
                    config.smoothing.degree,
                    config.divergence.max_points_to_check
                ),
            )),
            Err(e) => checks.push(Check::error("config", e.to_string())),
        },
        None => {
            let config = PipelineConfig::default();
            checks.push(Check::ok(
                "config",
                format!(
                    "Using defaults (window {}, degree {}, {} leading fixes checked)",
                    config.smoothing.window,
                    config.smoothing.degree,
                    config.divergence.max_points_to_check
                ),
            ));
        }
    }

    let stdout_check = if atty::is(atty::Stream::Stdout) {
        Check::ok("stdout", "stdout is a TTY (pretty reports)")
    } else {
        Check::ok("stdout", "stdout is a pipe (compact reports)")
    };
    checks.push(stdout_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TRAJECTO_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Trajecto Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        print_checks(&report.checks);
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TrajectoCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn print_checks(checks: &[Check]) {
    for check in checks {
        let status_icon = match check.status {
            CheckStatus::Ok => "[OK]",
            CheckStatus::Warning => "[WARN]",
            CheckStatus::Error => "[ERR]",
        };
        println!("  {} {}: {}", status_icon, check.name, check.message);
    }
}

fn duration(timestamps: &[f64]) -> f64 {
    match (timestamps.first(), timestamps.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    }
}

// Error types

#[derive(Debug)]
enum TrajectoCliError {
    Io(io::Error),
    Trajectory(TrajectoryError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for TrajectoCliError {
    fn from(e: io::Error) -> Self {
        TrajectoCliError::Io(e)
    }
}

impl From<TrajectoryError> for TrajectoCliError {
    fn from(e: TrajectoryError) -> Self {
        TrajectoCliError::Trajectory(e)
    }
}

impl From<serde_json::Error> for TrajectoCliError {
    fn from(e: serde_json::Error) -> Self {
        TrajectoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrajectoCliError> for CliError {
    fn from(e: TrajectoCliError) -> Self {
        match e {
            TrajectoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TrajectoCliError::Trajectory(e) => {
                let (code, hint) = match &e {
                    TrajectoryError::InvalidParameter(_) | TrajectoryError::ConfigError(_) => (
                        "CONFIG_ERROR",
                        "Run 'trajecto doctor --config <file>' to check the configuration",
                    ),
                    TrajectoryError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                    e if e.is_data_error() => (
                        "CAPTURE_ERROR",
                        "Run 'trajecto validate --input <dir>' for details",
                    ),
                    _ => ("PROCESSING_ERROR", "Re-run with --verbose for stage logs"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            TrajectoCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            TrajectoCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} capture checks failed", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            TrajectoCliError::DoctorFailed => CliError {
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
    input: String,
    valid: bool,
    checks: Vec<Check>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<Check>,
}

#[derive(serde::Serialize)]
struct Check {
    name: String,
    status: CheckStatus,
    message: String,
}

impl Check {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
        }
    }

    fn ok(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Ok, message)
    }

    fn warning(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warning, message)
    }

    fn error(name: &str, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Error, message)
    }
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
