//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - loads `Settings` once
//! - parses CLI arguments and dispatches to a handler
//! - prints reports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AuditArgs, Command, IngestArgs, OutputFormat, WeatherArgs};
use crate::config::Settings;
use crate::data::openmeteo::{self, OpenMeteoClient, WeatherRequest};
use crate::domain::RawIngestionPayload;
use crate::error::{AppError, EXIT_EXTERNAL, EXIT_USAGE, PersistenceError};
use crate::io::store::{FsStore, SeriesStore};
use crate::report::{self, AuditRow, IngestReport};

pub mod pipeline;

/// Environment variable holding the log filter (`warn` when unset).
pub const LOG_ENV: &str = "TSI_LOG";

/// Entry point for the `tsi` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging();
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Ingest(args) => handle_ingest(args, &settings),
        Command::Audit(args) => handle_audit(args, &settings),
        Command::Weather(args) => handle_weather(args, &settings),
        Command::Granularities => {
            print!("{}", report::format_granularities(&settings));
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (e.g. from a test harness) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_ingest(args: IngestArgs, settings: &Settings) -> Result<(), AppError> {
    let csv_text = std::fs::read_to_string(&args.file)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to read '{}': {e}", args.file.display())))?;

    let payload = RawIngestionPayload {
        csv_text,
        granularity: args.granularity,
        timezone: args.timezone,
        name: args.name,
    };

    let report = if args.dry_run {
        IngestReport::dry_run(&pipeline::ingest(&payload, settings)?)
    } else {
        let store = FsStore::new(settings.raw_path());
        IngestReport::stored(&pipeline::ingest_and_store(&payload, settings, &store)?)
    };

    match args.format {
        OutputFormat::Text => print!("{}", report::format_ingest_summary(&report)),
        OutputFormat::Json => println!("{}", to_json(&report)?),
    }
    Ok(())
}

fn handle_audit(args: AuditArgs, settings: &Settings) -> Result<(), AppError> {
    let dir = settings.raw_path();
    if !dir.is_dir() {
        return Err(AppError::new(
            EXIT_USAGE,
            format!("Raw data directory '{}' does not exist.", dir.display()),
        ));
    }

    let entries = crate::io::stored::audit_directory(&dir, settings)?;
    let rows: Vec<AuditRow> = entries.iter().map(AuditRow::from).collect();

    match args.format {
        OutputFormat::Text => print!("{}", report::format_audit(&rows)),
        OutputFormat::Json => println!("{}", to_json(&rows)?),
    }
    Ok(())
}

fn handle_weather(args: WeatherArgs, settings: &Settings) -> Result<(), AppError> {
    let variables = if args.variables.is_empty() {
        settings.weather_variables.clone()
    } else {
        args.variables
    };
    let request = WeatherRequest {
        city: args.city,
        country: args.country,
        start_date: args.start,
        end_date: args.end,
        variables,
    };
    request.validate(settings)?;

    settings
        .ensure_directories()
        .map_err(|e| AppError::from(PersistenceError::new(settings.weather_path(), e)))?;

    let client = OpenMeteoClient::new(settings);
    let location = client.geocode(&request.city, &request.country)?;
    tracing::info!(city = %location.name, lat = location.latitude, lon = location.longitude, "geocoded");

    let response = client.fetch_hourly(&location, &request)?;
    let outcomes = openmeteo::build_series(&response, &request, settings)?;

    let store = FsStore::new(settings.weather_path());
    for outcome in outcomes {
        let file_path = store.write(&outcome.storage_key, outcome.csv.as_bytes())?;
        let stored = pipeline::StoredOutcome {
            file_written: store.exists(&outcome.storage_key),
            file_path,
            outcome,
        };
        print!("{}", report::format_ingest_summary(&IngestReport::stored(&stored)));
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(EXIT_EXTERNAL, format!("Failed to encode JSON output: {e}")))
}
