//! Snapshot CLI - Command-line interface for Health Snapshot
//!
//! Commands:
//! - aggregate: Aggregate a snapshot from a provider fixture
//! - reconcile: Reconcile captured raw readings offline
//! - rules: Print the field resolution table
//! - doctor: Check configuration and credentials
//! - init-config: Write a default configuration file

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use health_snapshot::config::{ENV_APP_ID, ENV_APP_SECRET, ENV_EXTERNAL_ID};
use health_snapshot::display::{format_duration_seconds, format_value, ScoreBand};
use health_snapshot::encoder::SnapshotEncoder;
use health_snapshot::reconcile::DiagnosticKind;
use health_snapshot::rules::FIELD_RULES;
use health_snapshot::types::FieldGroup;
use health_snapshot::{
    AggregatorConfig, FixtureProvider, HealthSnapshotAggregator, QueryWindow, RawReadings,
    Reconciler, SnapshotError, SnapshotField, SnapshotReport, PRODUCER_NAME,
    SNAPSHOT_CRATE_VERSION,
};

/// Snapshot - normalized health metrics from a biometrics provider
#[derive(Parser)]
#[command(name = "snapshot")]
#[command(author = "Synheart AI Inc")]
#[command(version = SNAPSHOT_CRATE_VERSION)]
#[command(about = "Aggregate provider biomarkers into a health snapshot", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a snapshot from a provider fixture
    Aggregate {
        /// Fixture file path (use - for stdin)
        #[arg(short, long)]
        fixture: PathBuf,

        /// Window start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// Window end (RFC 3339, exclusive)
        #[arg(long)]
        end: DateTime<Utc>,

        /// Configuration file
        #[arg(short, long, env = "SNAPSHOT_CONFIG")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Reconcile captured raw readings offline
    Reconcile {
        /// Raw readings file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Print the field resolution table
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check configuration and credentials
    Doctor {
        /// Configuration file
        #[arg(short, long, env = "SNAPSHOT_CONFIG")]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "snapshot.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Human-readable summary
    Text,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), SnapshotCliError> {
    match cli.command {
        Commands::Aggregate {
            fixture,
            start,
            end,
            config,
            output_format,
        } => cmd_aggregate(&fixture, start, end, config.as_deref(), output_format).await,

        Commands::Reconcile {
            input,
            output_format,
        } => cmd_reconcile(&input, output_format),

        Commands::Rules { json } => cmd_rules(json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::InitConfig { path, force } => cmd_init_config(&path, force),
    }
}

async fn cmd_aggregate(
    fixture: &Path,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), SnapshotCliError> {
    let window = QueryWindow::new(start, end)?;
    let config = AggregatorConfig::resolve(config)?;
    let provider = FixtureProvider::from_json(&read_input(fixture)?)?;

    debug!(
        local_only = config.is_local_only(),
        environment = ?config.environment,
        "aggregating from fixture"
    );

    let aggregator = HealthSnapshotAggregator::with_config(provider, config);
    let report = aggregator.aggregate_report(window.start, window.end).await?;

    let output = match output_format {
        OutputFormat::Json => {
            serde_json::to_string(&SnapshotEncoder::new().encode(&report, &window))?
        }
        OutputFormat::JsonPretty => SnapshotEncoder::new().encode_to_json(&report, &window)?,
        OutputFormat::Text => render_text(&report),
    };
    println!("{}", output);

    Ok(())
}

fn cmd_reconcile(input: &Path, output_format: OutputFormat) -> Result<(), SnapshotCliError> {
    let readings: RawReadings = serde_json::from_str(&read_input(input)?)?;
    let report = Reconciler::reconcile(&readings);

    let output = match output_format {
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => render_text(&report),
    };
    println!("{}", output);

    Ok(())
}

fn cmd_rules(json: bool) -> Result<(), SnapshotCliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(FIELD_RULES)?);
        return Ok(());
    }

    println!("Field Resolution Rules");
    println!("======================");
    for rule in FIELD_RULES {
        let range = rule
            .range
            .map(|r| r.to_string())
            .unwrap_or_else(|| "any".to_string());
        println!("{} ({}) range {}", rule.field.as_str(), rule.field.unit(), range);

        for candidate in rule.candidates {
            let mut line = format!("  - {}", candidate.source);
            if let Some(accept) = candidate.accept {
                line.push_str(&format!(" accept {}", accept));
            }
            if candidate.multiplier != 1.0 {
                line.push_str(&format!(" x{}", candidate.multiplier));
            }
            println!("{}", line);
        }
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), SnapshotCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, SNAPSHOT_CRATE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "rules".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} field rules loaded", FIELD_RULES.len()),
    });

    match config {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Config file {} does not exist", path.display()),
        }),
        _ => match AggregatorConfig::resolve(config) {
            Ok(resolved) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: match config {
                        Some(path) => format!("Config file {} is valid", path.display()),
                        None => "Using default configuration".to_string(),
                    },
                });
                checks.push(DoctorCheck {
                    name: "sensors".to_string(),
                    status: if resolved.sensors.is_empty() {
                        CheckStatus::Warning
                    } else {
                        CheckStatus::Ok
                    },
                    message: format!("{} sensors enabled", resolved.sensors.len()),
                });
                checks.push(credentials_check(&resolved));
            }
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        },
    }

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: SNAPSHOT_CRATE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Snapshot Doctor Report");
        println!("======================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SnapshotCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn credentials_check(config: &AggregatorConfig) -> DoctorCheck {
    match &config.credentials {
        None => DoctorCheck {
            name: "credentials".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "No credentials; running local-sensor-only (set {}, {}, {})",
                ENV_APP_ID, ENV_APP_SECRET, ENV_EXTERNAL_ID
            ),
        },
        Some(c) if c.app_id.is_empty() || c.app_secret.is_empty() || c.external_id.is_empty() => {
            DoctorCheck {
                name: "credentials".to_string(),
                status: CheckStatus::Error,
                message: "Credentials present but incomplete".to_string(),
            }
        }
        Some(c) => DoctorCheck {
            name: "credentials".to_string(),
            status: CheckStatus::Ok,
            message: format!("Authenticating app {} as {}", c.app_id, c.external_id),
        },
    }
}

fn cmd_init_config(path: &Path, force: bool) -> Result<(), SnapshotCliError> {
    if path.exists() && !force {
        return Err(SnapshotCliError::AlreadyExists(path.to_path_buf()));
    }

    fs::write(path, AggregatorConfig::default_toml())?;
    println!("Wrote default configuration to {}", path.display());

    Ok(())
}

// Helper functions

fn read_input(path: &Path) -> Result<String, SnapshotCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn group_title(group: FieldGroup) -> &'static str {
    match group {
        FieldGroup::Vitals => "Vitals",
        FieldGroup::Activity => "Activity",
        FieldGroup::BodyComposition => "Body Composition",
        FieldGroup::Sleep => "Sleep",
        FieldGroup::Scores => "Wellness Scores",
    }
}

fn render_field(report: &SnapshotReport, field: SnapshotField) -> String {
    let value = report.snapshot.value(field);
    let rendered = match field.group() {
        FieldGroup::Scores => match value {
            Some(v) => format!("{:.0}% ({})", v * 100.0, ScoreBand::from_fraction(value)),
            None => ScoreBand::NoData.to_string(),
        },
        _ => match field.unit() {
            "s" => format_duration_seconds(value),
            unit => match value {
                Some(_) => format!("{} {}", format_value(value, 1), unit),
                None => format_value(value, 1),
            },
        },
    };

    let notes: Vec<String> = report
        .diagnostics_for(field)
        .map(|kind| match kind {
            DiagnosticKind::FactorFallback { factor } => format!("from factor {}", factor),
            DiagnosticKind::ValueOutOfRange { source, value } => {
                format!("rejected {} = {}", source, value)
            }
            other => other.code().replace('_', " "),
        })
        .collect();

    if notes.is_empty() {
        rendered
    } else {
        format!("{}  [{}]", rendered, notes.join("; "))
    }
}

fn render_text(report: &SnapshotReport) -> String {
    let mut lines = vec![
        "Health Snapshot".to_string(),
        "===============".to_string(),
        format!("Coverage: {:.0}%", report.snapshot.coverage() * 100.0),
    ];

    let mut current: Option<FieldGroup> = None;
    for field in SnapshotField::ALL {
        let group = field.group();
        if current != Some(group) {
            lines.push(String::new());
            lines.push(format!("{}:", group_title(group)));
            current = Some(group);
        }
        lines.push(format!("  {:<28} {}", field.as_str(), render_field(report, field)));
    }

    lines.join("\n")
}

// Error types

#[derive(Debug)]
enum SnapshotCliError {
    Io(io::Error),
    Snapshot(SnapshotError),
    Json(serde_json::Error),
    AlreadyExists(PathBuf),
    DoctorFailed,
}

impl From<io::Error> for SnapshotCliError {
    fn from(e: io::Error) -> Self {
        SnapshotCliError::Io(e)
    }
}

impl From<SnapshotError> for SnapshotCliError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::Io(e) => SnapshotCliError::Io(e),
            SnapshotError::JsonError(e) => SnapshotCliError::Json(e),
            other => SnapshotCliError::Snapshot(other),
        }
    }
}

impl From<serde_json::Error> for SnapshotCliError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SnapshotCliError> for CliError {
    fn from(e: SnapshotCliError) -> Self {
        match e {
            SnapshotCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SnapshotCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SnapshotCliError::Snapshot(e) => {
                let (code, hint) = match &e {
                    SnapshotError::ProviderUnsupportedPlatform => (
                        "UNSUPPORTED_PLATFORM",
                        "The provider cannot run on this platform",
                    ),
                    SnapshotError::AuthenticationFailed(_) => (
                        "AUTHENTICATION_FAILED",
                        "Run 'snapshot doctor' to check credentials",
                    ),
                    SnapshotError::InvalidWindow { .. } => {
                        ("INVALID_WINDOW", "--start must be before --end")
                    }
                    SnapshotError::Config(_) => {
                        ("CONFIG_ERROR", "Run 'snapshot init-config' for a template")
                    }
                    SnapshotError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                    SnapshotError::Io(_) => ("IO_ERROR", "Check file paths and permissions"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SnapshotCliError::AlreadyExists(path) => CliError {
                code: "ALREADY_EXISTS".to_string(),
                message: format!("{} already exists", path.display()),
                hint: Some("Pass --force to overwrite".to_string()),
            },
            SnapshotCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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

#[cfg(test)]
mod tests {
    use super::*;
    use health_snapshot::types::{BiomarkerType, ScoreType};

    fn report() -> SnapshotReport {
        let mut raw = RawReadings::default();
        raw.biomarkers.insert(BiomarkerType::Weight, 70.4);
        raw.factors.insert("active_hours".to_string(), 1.5);
        raw.scores.insert(ScoreType::Sleep, 0.82);
        Reconciler::reconcile(&raw)
    }

    fn line_for<'a>(text: &'a str, field: SnapshotField) -> &'a str {
        let prefix = format!("  {} ", field.as_str());
        text.lines()
            .find(|line| line.starts_with(&prefix))
            .unwrap_or_else(|| panic!("no line for {}", field.as_str()))
    }

    #[test]
    fn test_render_text_sections_and_coverage() {
        let text = render_text(&report());

        assert!(text.starts_with("Health Snapshot\n"));
        assert!(text.contains("Coverage: 10%"));
        for title in ["Vitals:", "Activity:", "Body Composition:", "Sleep:", "Wellness Scores:"] {
            assert_eq!(text.lines().filter(|l| *l == title).count(), 1, "{title}");
        }
    }

    #[test]
    fn test_render_text_field_values() {
        let text = render_text(&report());

        assert!(line_for(&text, SnapshotField::Weight).ends_with(" 70.4 kg"));
        assert!(line_for(&text, SnapshotField::ActiveDuration)
            .ends_with(" 1h 30m  [from factor active_hours]"));
        assert!(line_for(&text, SnapshotField::SleepScore).ends_with(" 82% (Excellent)"));
        assert!(line_for(&text, SnapshotField::ReadinessScore)
            .ends_with(" No Data  [partial data unavailable]"));
        assert!(line_for(&text, SnapshotField::Vo2Max).ends_with(" --  [partial data unavailable]"));
    }

    #[test]
    fn test_render_text_shows_rejected_value() {
        let mut raw = RawReadings::default();
        raw.biomarkers.insert(BiomarkerType::SleepEfficiency, 150.0);
        let text = render_text(&Reconciler::reconcile(&raw));

        assert!(line_for(&text, SnapshotField::SleepEfficiency)
            .ends_with(" --  [rejected biomarker:sleep_efficiency = 150]"));
    }

    #[test]
    fn test_cli_error_codes() {
        let now = Utc::now();
        let cases = [
            (SnapshotError::ProviderUnsupportedPlatform, "UNSUPPORTED_PLATFORM"),
            (SnapshotError::AuthenticationFailed("denied".to_string()), "AUTHENTICATION_FAILED"),
            (SnapshotError::InvalidWindow { start: now, end: now }, "INVALID_WINDOW"),
            (SnapshotError::Config("bad".to_string()), "CONFIG_ERROR"),
            (io::Error::new(io::ErrorKind::NotFound, "missing").into(), "IO_ERROR"),
        ];

        for (error, code) in cases {
            let cli_error = CliError::from(SnapshotCliError::from(error));
            assert_eq!(cli_error.code, code);
            assert!(cli_error.hint.is_some());
        }
    }

    #[test]
    fn test_json_errors_unwrap_to_json_code() {
        let json_error = serde_json::from_str::<RawReadings>("{").unwrap_err();
        let cli_error = CliError::from(SnapshotCliError::from(SnapshotError::from(json_error)));

        let payload = serde_json::to_value(&cli_error).unwrap();
        assert_eq!(payload["code"], "JSON_ERROR");
        assert!(payload["message"].as_str().is_some());
        assert_eq!(payload["hint"], "Check JSON syntax");
    }

    #[test]
    fn test_init_config_refuses_to_overwrite() {
        let path = std::env::temp_dir().join(format!("snapshot-init-{}.toml", std::process::id()));
        fs::write(&path, "existing").unwrap();

        let result = cmd_init_config(&path, false);

        assert!(matches!(result, Err(SnapshotCliError::AlreadyExists(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");
        fs::remove_file(&path).unwrap();
    }
}
