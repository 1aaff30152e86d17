//! Timezone allow-list check and timestamp resolution.
//!
//! Per-element contract:
//! - text carrying a UTC offset (or `Z`) is an absolute instant and is
//!   converted into the declared zone
//! - text without an offset is a wall-clock time in the declared zone
//!   (tagged, not converted); times that are skipped or repeated by a DST
//!   transition are rejected

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::config::Settings;
use crate::domain::{NormalizedFrame, ResolvedFrame};
use crate::error::IngestError;

const OFFSET_FORMATS: [&str; 8] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Check the declared timezone against the allow-list.
///
/// Runs before the CSV text is looked at.
pub fn check_timezone(declared: &str, settings: &Settings) -> Result<Tz, IngestError> {
    settings.allowed_timezone(declared).ok_or_else(|| {
        IngestError::Timezone(format!(
            "Timezone '{declared}' not allowed. Allowed: {:?}",
            settings.timezone_options()
        ))
    })
}

/// Resolve every timestamp of the frame into `tz`.
pub fn resolve_timestamps(frame: NormalizedFrame, tz: Tz) -> Result<ResolvedFrame, IngestError> {
    let mut index = Vec::with_capacity(frame.rows.len());
    let mut values = Vec::with_capacity(frame.rows.len());

    for row in frame.rows {
        let ts = parse_timestamp(&row.timestamp, tz)
            .map_err(|msg| IngestError::Parse(format!("Line {}: {msg}", row.line)))?;
        index.push(ts);
        values.push(row.value);
    }

    Ok(ResolvedFrame {
        timezone: tz,
        index,
        values,
    })
}

/// Parse a single timestamp and express it in `tz`.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Tz>, String> {
    let s = raw.trim();
    if s.is_empty() {
        return Err("missing timestamp.".to_string());
    }

    if let Some(instant) = parse_with_offset(s) {
        return Ok(instant.with_timezone(&tz));
    }

    let naive = parse_naive(s).ok_or_else(|| {
        format!("invalid timestamp '{s}'. Expected ISO-8601, e.g. 2024-01-01 00:00:00 or 2024-01-01T00:00:00+01:00.")
    })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(ts) => Ok(ts),
        LocalResult::Ambiguous(_, _) => Err(format!("local time '{s}' is ambiguous in {}.", tz.name())),
        LocalResult::None => Err(format!("local time '{s}' does not exist in {}.", tz.name())),
    }
}

/// Parse text that carries an explicit offset; `None` if it has none.
pub fn parse_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    let normalized;
    let s = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        Some(rest) => {
            normalized = format!("{rest}+00:00");
            normalized.as_str()
        }
        None => s,
    };
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
