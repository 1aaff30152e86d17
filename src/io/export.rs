//! Canonical CSV rendering and storage keys.
//!
//! Rendering is a total function over `TimeSeriesData`: no validation here.
//! The output re-ingests to the same series when declared with the same
//! timezone and granularity.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::config::Settings;
use crate::domain::{TIMESTAMP_LABEL, TimeSeriesData, VALUE_LABEL};

/// ISO-8601 with an explicit offset; sub-second digits only when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";

/// Render the series as `timestamp,value` CSV text, one row per point.
pub fn render_csv(series: &TimeSeriesData) -> String {
    let mut out = String::with_capacity(32 * (series.len() + 1));
    out.push_str(TIMESTAMP_LABEL);
    out.push(',');
    out.push_str(VALUE_LABEL);
    out.push('\n');

    for (ts, value) in series.index().iter().zip(series.values()) {
        // `{:?}` is the shortest text that parses back to the same f64.
        let _ = writeln!(out, "{},{:?}", ts.format(TIMESTAMP_FORMAT), value);
    }
    out
}

/// `<name>_<granularity>.csv`; anonymous series use the `y` prefix as name.
pub fn storage_key(series: &TimeSeriesData) -> String {
    format!("{}_{}.csv", series.name(), series.granularity())
}

/// `<data_dir>/<raw_dir>/<storage_key>`.
pub fn storage_path(settings: &Settings, series: &TimeSeriesData) -> PathBuf {
    settings.raw_path().join(storage_key(series))
}
