//! Command-line parsing for the time-series ingestion tool.
//!
//! Argument parsing stays separate from the pipeline; handlers live in
//! `crate::app`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tsi", version, about = "Validate and normalize CSV time series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate a CSV file and store its canonical form under the raw data directory.
    Ingest(IngestArgs),
    /// Re-validate every stored series.
    Audit(AuditArgs),
    /// Fetch hourly weather for a city and store one series per variable.
    Weather(WeatherArgs),
    /// List the supported granularities and their frequencies.
    Granularities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser, Clone)]
pub struct IngestArgs {
    /// CSV file with a `timestamp` column and one value column.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub file: PathBuf,

    /// Declared sampling cadence (hourly, daily, monthly).
    #[arg(short = 'g', long)]
    pub granularity: String,

    /// IANA timezone the timestamps are expressed in.
    #[arg(short = 'z', long)]
    pub timezone: String,

    /// Series name; omitted for a single anonymous feed.
    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Validate and render without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Parser, Clone)]
pub struct AuditArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Parser, Clone)]
pub struct WeatherArgs {
    #[arg(long)]
    pub city: String,

    /// ISO 3166-1 alpha-2 country code.
    #[arg(long)]
    pub country: String,

    /// First day (YYYY-MM-DD).
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day, inclusive (YYYY-MM-DD).
    #[arg(long)]
    pub end: NaiveDate,

    /// Hourly variable to fetch; repeatable. Defaults to every configured variable.
    #[arg(long = "variable", value_name = "NAME")]
    pub variables: Vec<String>,
}
