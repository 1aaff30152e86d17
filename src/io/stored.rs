//! Read persisted series back.
//!
//! Stored files are named `<name>_<granularity>.csv` and carry explicit UTC
//! offsets. The zone is recovered as the first allowed timezone whose
//! offsets reproduce every stored offset, then the file runs through the
//! normal validation pipeline.

use std::path::{Path, PathBuf};

use chrono::Offset;
use chrono_tz::Tz;
use rayon::prelude::*;

use crate::app::pipeline;
use crate::config::Settings;
use crate::domain::{RawIngestionPayload, SeriesName, TimeSeriesData};
use crate::error::StoredSeriesError;
use crate::io::ingest::parse_csv_text;
use crate::validate::timezone::parse_with_offset;

/// Load and re-validate a persisted series.
pub fn load_stored_series(path: &Path, settings: &Settings) -> Result<TimeSeriesData, StoredSeriesError> {
    if !settings.is_supported_extension(path) {
        return Err(StoredSeriesError::UnsupportedExtension {
            path: path.to_path_buf(),
            supported: settings.supported_extensions.clone(),
        });
    }
    let (name, granularity) = split_file_name(path)?;

    let text = std::fs::read_to_string(path).map_err(|source| StoredSeriesError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let frame = parse_csv_text(&text)?;
    let timestamps: Vec<&str> = frame.rows.iter().map(|r| r.timestamp.as_str()).collect();
    let tz = detect_timezone(&timestamps, &settings.allowed_timezones)
        .ok_or_else(|| StoredSeriesError::UnknownTimezone { path: path.to_path_buf() })?;

    let payload = RawIngestionPayload {
        csv_text: text,
        granularity,
        timezone: tz.name().to_string(),
        name: Some(name),
    };
    let validated = pipeline::validate(&payload, settings)?;
    let series = TimeSeriesData::assemble(validated, SeriesName::from(payload.name))?;
    Ok(series)
}

/// Split `<name>_<granularity>.<ext>` at the last underscore.
fn split_file_name(path: &Path) -> Result<(String, String), StoredSeriesError> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    match stem.rsplit_once('_') {
        Some((name, granularity)) if !name.is_empty() && !granularity.is_empty() => {
            Ok((name.to_string(), granularity.to_ascii_lowercase()))
        }
        _ => Err(StoredSeriesError::FileName(file_name.to_string())),
    }
}

/// First zone in `allowed` whose UTC offset matches every timestamp's offset.
///
/// Timestamps without an offset match nothing.
pub fn detect_timezone(timestamps: &[&str], allowed: &[Tz]) -> Option<Tz> {
    let instants: Vec<_> = timestamps
        .iter()
        .map(|s| parse_with_offset(s.trim()))
        .collect::<Option<_>>()?;
    allowed.iter().copied().find(|tz| {
        instants
            .iter()
            .all(|dt| dt.with_timezone(tz).offset().fix() == *dt.offset())
    })
}

/// Outcome of re-validating one stored file.
#[derive(Debug)]
pub struct AuditEntry {
    pub path: PathBuf,
    pub result: Result<AuditOk, StoredSeriesError>,
}

#[derive(Debug, Clone)]
pub struct AuditOk {
    pub name: String,
    pub granularity: String,
    pub data_points: usize,
}

/// Re-validate every supported file directly under `dir`, in parallel.
pub fn audit_directory(dir: &Path, settings: &Settings) -> Result<Vec<AuditEntry>, StoredSeriesError> {
    let read = std::fs::read_dir(dir).map_err(|source| StoredSeriesError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in read {
        let entry = entry.map_err(|source| StoredSeriesError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && settings.is_supported_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let entries = paths
        .into_par_iter()
        .map(|path| {
            let result = load_stored_series(&path, settings).map(|series| AuditOk {
                name: series.name().to_string(),
                granularity: series.granularity().to_string(),
                data_points: series.len(),
            });
            if let Err(err) = &result {
                tracing::warn!(path = %path.display(), kind = err.kind(), "stored series failed validation");
            }
            AuditEntry { path, result }
        })
        .collect();

    Ok(entries)
}
