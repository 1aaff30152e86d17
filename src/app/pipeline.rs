//! The ingestion pipeline shared by every front-end (CLI, audit, weather).
//!
//! Stages run strictly in this order and the first failure wins:
//!
//! 1. timezone allow-list (before the CSV is looked at)
//! 2. CSV parse + two-column schema
//! 3. timestamp resolution into the declared zone
//! 4. declared granularity
//! 5. minimum length
//! 6. frequency inference + full-grid equality + granularity cadence
//! 7. value column (numeric, null, policy)
//! 8. name (domain assembly)
//! 9. canonical CSV + storage key
//!
//! Every stage is a pure function of the previous stage's output and the
//! read-only `Settings`.

use std::path::PathBuf;

use crate::config::Settings;
use crate::domain::{RawIngestionPayload, SeriesName, TimeSeriesData, ValidatedTimeSeries};
use crate::error::{AppError, IngestError};
use crate::io::export::{render_csv, storage_key, storage_path};
use crate::io::ingest::parse_csv_text;
use crate::io::store::SeriesStore;
use crate::validate;

/// A validated, named series with its canonical rendering.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub series: TimeSeriesData,
    pub csv: String,
    pub storage_key: String,
    /// Where the caller is expected to store it: `<data_dir>/<raw_dir>/<key>`.
    pub storage_path: PathBuf,
}

/// An outcome after the write attempt.
#[derive(Debug, Clone)]
pub struct StoredOutcome {
    pub outcome: IngestOutcome,
    pub file_path: PathBuf,
    pub file_written: bool,
}

/// Stages 1-7: turn a raw payload into a validated series.
pub fn validate(payload: &RawIngestionPayload, settings: &Settings) -> Result<ValidatedTimeSeries, IngestError> {
    let tz = validate::check_timezone(&payload.timezone, settings)?;

    let frame = parse_csv_text(&payload.csv_text)?;
    tracing::debug!(rows = frame.rows.len(), column = %frame.source_label, "parsed CSV");

    let resolved = validate::resolve_timestamps(frame, tz)?;
    let granularity = validate::check_granularity(&payload.granularity, settings)?;

    validate::check_length(resolved.index.len(), settings.min_points)?;
    let frequency = validate::check_continuity(&resolved.index, granularity)?;
    let values = validate::coerce_values(&resolved.values, settings.value_policy)?;

    Ok(ValidatedTimeSeries::from_checked(
        resolved.index,
        values,
        granularity,
        resolved.timezone,
        frequency,
    ))
}

/// Stages 1-9 without touching storage.
pub fn ingest(payload: &RawIngestionPayload, settings: &Settings) -> Result<IngestOutcome, IngestError> {
    let result = validate(payload, settings)
        .and_then(|validated| TimeSeriesData::assemble(validated, SeriesName::from(payload.name.clone())));

    let series = match result {
        Ok(series) => series,
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "ingestion rejected");
            return Err(err);
        }
    };

    let csv = render_csv(&series);
    let key = storage_key(&series);
    let path = storage_path(settings, &series);
    tracing::info!(name = series.name(), granularity = %series.granularity(), points = series.len(), "series validated");

    Ok(IngestOutcome {
        series,
        csv,
        storage_key: key,
        storage_path: path,
    })
}

/// Validate, render, and hand the bytes to `store`.
///
/// Validation failures and persistence failures stay distinguishable through
/// their exit codes.
pub fn ingest_and_store(
    payload: &RawIngestionPayload,
    settings: &Settings,
    store: &dyn SeriesStore,
) -> Result<StoredOutcome, AppError> {
    let outcome = ingest(payload, settings)?;
    let file_path = store.write(&outcome.storage_key, outcome.csv.as_bytes())?;
    let file_written = store.exists(&outcome.storage_key);
    Ok(StoredOutcome {
        outcome,
        file_path,
        file_written,
    })
}
