//! Declared granularity check.
//!
//! Only membership is checked here. Whether the data actually has that
//! cadence is decided by the continuity check.

use crate::config::Settings;
use crate::domain::Granularity;
use crate::error::IngestError;

pub fn check_granularity(declared: &str, settings: &Settings) -> Result<Granularity, IngestError> {
    Granularity::from_name(declared)
        .filter(|g| settings.granularities.contains(g))
        .ok_or_else(|| {
            IngestError::Granularity(format!(
                "Granularity '{declared}' is not supported. Allowed: {:?}",
                settings.granularity_options()
            ))
        })
}
