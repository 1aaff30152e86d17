//! Shared domain types.
//!
//! Stage outputs are separate types so that each stage can only be fed the
//! output of the one before it:
//!
//! `RawIngestionPayload` -> `NormalizedFrame` -> `ResolvedFrame`
//! -> `ValidatedTimeSeries` -> `TimeSeriesData`
//!
//! `ValidatedTimeSeries` and `TimeSeriesData` have private fields: an instance
//! only exists if every check passed.

use std::fmt;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Prefix used in place of a name for the anonymous (single-feed) variant.
pub const ANONYMOUS_PREFIX: &str = "y";

/// Canonical label of the data column.
pub const VALUE_LABEL: &str = "value";

/// Canonical label of the timestamp column.
pub const TIMESTAMP_LABEL: &str = "timestamp";

/// A named sampling cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Hourly, Granularity::Daily, Granularity::Monthly];

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
            Granularity::Monthly => "monthly",
        }
    }

    /// Exact (case-sensitive) lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == name)
    }

    /// The canonical sampling frequency this granularity implies.
    pub fn frequency(self) -> Frequency {
        match self {
            Granularity::Hourly => Frequency::Fixed(Duration::hours(1)),
            Granularity::Daily => Frequency::Days(1),
            Granularity::Monthly => Frequency::MonthStart(1),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sampling frequency, either inferred from data or implied by a granularity.
///
/// Fixed steps are measured in absolute time. Day and month steps are
/// measured on the local calendar of the series' zone, so a 23-hour DST day
/// is still one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Fixed(Duration),
    Days(u32),
    MonthStart(u32),
    MonthEnd(u32),
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Frequency::Fixed(step) => {
                let secs = step.num_seconds();
                if secs != 0 && secs % 3600 == 0 {
                    write!(f, "{}h", secs / 3600)
                } else if secs != 0 && secs % 60 == 0 {
                    write!(f, "{}min", secs / 60)
                } else {
                    write!(f, "{secs}s")
                }
            }
            Frequency::Days(n) => write!(f, "{n}D"),
            Frequency::MonthStart(n) => write!(f, "{n}MS"),
            Frequency::MonthEnd(n) => write!(f, "{n}ME"),
        }
    }
}

/// Which values are legal in the data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuePolicy {
    /// Every value must be `> 0` (loads, energy, prices).
    #[default]
    Positive,
    /// Any finite value (temperatures and other signed quantities).
    Finite,
}

impl ValuePolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(ValuePolicy::Positive),
            "finite" => Some(ValuePolicy::Finite),
            _ => None,
        }
    }
}

/// How the persisted series is identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesName {
    /// Caller-supplied name; must be non-blank.
    Named(String),
    /// Single-feed series stored under [`ANONYMOUS_PREFIX`].
    Anonymous,
}

impl From<Option<String>> for SeriesName {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(name) => SeriesName::Named(name),
            None => SeriesName::Anonymous,
        }
    }
}

/// Raw request tuple handed over by the surrounding service.
#[derive(Debug, Clone)]
pub struct RawIngestionPayload {
    pub csv_text: String,
    pub granularity: String,
    pub timezone: String,
    pub name: Option<String>,
}

/// One data row as read from the CSV, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the CSV text (header is line 1).
    pub line: usize,
    pub timestamp: String,
    pub value: String,
}

/// Two-column frame in raw row order; the data column is labelled `value`.
#[derive(Debug, Clone)]
pub struct NormalizedFrame {
    /// Header of the data column as it appeared in the input.
    pub source_label: String,
    pub rows: Vec<RawRow>,
}

/// Frame whose timestamps are resolved into a single zone. Values are still raw.
#[derive(Debug, Clone)]
pub struct ResolvedFrame {
    pub timezone: Tz,
    pub index: Vec<DateTime<Tz>>,
    pub values: Vec<String>,
}

/// A series that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTimeSeries {
    index: Vec<DateTime<Tz>>,
    values: Vec<f64>,
    granularity: Granularity,
    timezone: Tz,
    frequency: Frequency,
}

impl ValidatedTimeSeries {
    /// Only the pipeline builds these, after all checks have passed.
    pub(crate) fn from_checked(
        index: Vec<DateTime<Tz>>,
        values: Vec<f64>,
        granularity: Granularity,
        timezone: Tz,
        frequency: Frequency,
    ) -> Self {
        Self {
            index,
            values,
            granularity,
            timezone,
            frequency,
        }
    }

    pub fn index(&self) -> &[DateTime<Tz>] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Frequency inferred from the timestamps.
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// The persisted domain entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData {
    index: Vec<DateTime<Tz>>,
    values: Vec<f64>,
    granularity: Granularity,
    name: String,
}

impl TimeSeriesData {
    /// Attach an identifying name to a validated series.
    ///
    /// Named series must have a non-blank name that can be used as a file
    /// name component; anonymous series get [`ANONYMOUS_PREFIX`].
    pub fn assemble(series: ValidatedTimeSeries, name: SeriesName) -> Result<Self, IngestError> {
        let name = match name {
            SeriesName::Named(name) => validate_name(name)?,
            SeriesName::Anonymous => ANONYMOUS_PREFIX.to_string(),
        };
        Ok(Self {
            index: series.index,
            values: series.values,
            granularity: series.granularity,
            name,
        })
    }

    pub fn index(&self) -> &[DateTime<Tz>] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zone the index is expressed in.
    pub fn timezone(&self) -> Option<Tz> {
        self.index.first().map(|ts| ts.timezone())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

pub(crate) fn validate_name(name: String) -> Result<String, IngestError> {
    if name.trim().is_empty() {
        return Err(IngestError::Name("Name must be a non-empty string.".to_string()));
    }
    // The name becomes part of a file name under the raw data directory.
    if name.contains(['/', '\\']) || name == "." || name == ".." || name.chars().any(char::is_control) {
        return Err(IngestError::Name(format!(
            "Name '{}' cannot be used as a file name.",
            name.escape_debug()
        )));
    }
    Ok(name)
}
