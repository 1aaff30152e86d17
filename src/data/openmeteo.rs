//! Open-Meteo integration: city geocoding and hourly archive weather.
//!
//! Every requested variable becomes one single-variable series that goes
//! through the regular ingestion pipeline (hourly, UTC, finite values).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::app::pipeline::{self, IngestOutcome};
use crate::config::Settings;
use crate::domain::types::validate_name;
use crate::domain::{Granularity, RawIngestionPayload, ValuePolicy};
use crate::error::{AppError, EXIT_EXTERNAL, EXIT_USAGE, PersistenceError};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// First geocoding match for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl GeoLocation {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AppError::new(
                EXIT_EXTERNAL,
                format!("Latitude {} is outside [-90, 90].", self.latitude),
            ));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AppError::new(
                EXIT_EXTERNAL,
                format!("Longitude {} is outside [-180, 180].", self.longitude),
            ));
        }
        Ok(())
    }
}

/// What the `weather` command asks for.
#[derive(Debug, Clone)]
pub struct WeatherRequest {
    pub city: String,
    pub country: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub variables: Vec<String>,
}

impl WeatherRequest {
    /// Check dates and variables against the configured allow-list.
    pub fn validate(&self, settings: &Settings) -> Result<(), AppError> {
        if self.city.trim().is_empty() {
            return Err(AppError::new(EXIT_USAGE, "City must be a non-empty string."));
        }
        // Both end up in the geocoding cache file name.
        for part in [&self.city, &self.country] {
            validate_name(part.clone()).map_err(|e| AppError::new(EXIT_USAGE, e.message()))?;
        }
        if self.end_date < self.start_date {
            return Err(AppError::new(EXIT_USAGE, "end_date cannot be earlier than start_date"));
        }
        if self.variables.is_empty() {
            return Err(AppError::new(EXIT_USAGE, "At least one hourly variable is required."));
        }
        for var in &self.variables {
            if !settings.weather_variables.contains(var) {
                return Err(AppError::new(
                    EXIT_USAGE,
                    format!(
                        "Hourly parameter '{var}' is not supported. Allowed parameters: {:?}",
                        settings.weather_variables
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Series name for one variable: `<city>_<variable>`.
    pub fn series_name(&self, variable: &str) -> String {
        format!("{}_{variable}", self.city.trim())
    }
}

/// Archive response as requested with `timeformat=unixtime`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset_seconds: i32,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub hourly_units: HashMap<String, String>,
    pub hourly: HourlyBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<i64>,
    #[serde(flatten)]
    pub variables: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeoLocation>,
}

pub struct OpenMeteoClient {
    client: Client,
    cache_dir: PathBuf,
}

impl OpenMeteoClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            cache_dir: settings.weather_path(),
        }
    }

    /// Geocode `city` within `country`, reusing the JSON cache when readable.
    pub fn geocode(&self, city: &str, country: &str) -> Result<GeoLocation, AppError> {
        let cache = geocode_cache_path(&self.cache_dir, city, country);
        if let Some(location) = read_cached_location(&cache) {
            tracing::debug!(path = %cache.display(), "geocoding cache hit");
            return Ok(location);
        }

        let resp = self
            .client
            .get(GEOCODING_URL)
            .query(&[
                ("name", city),
                ("count", "1"),
                ("countryCode", country),
                ("language", "en"),
                ("format", "json"),
            ])
            .send()
            .map_err(|e| AppError::new(EXIT_EXTERNAL, format!("Geocoding request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                EXIT_EXTERNAL,
                format!("Geocoding request failed with status {}.", resp.status()),
            ));
        }

        let body: GeocodingResponse = resp
            .json()
            .map_err(|e| AppError::new(EXIT_EXTERNAL, format!("Failed to parse geocoding response: {e}")))?;
        let location = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| AppError::new(EXIT_EXTERNAL, format!("No geocoding match for '{city}' in '{country}'.")))?;
        location.validate()?;

        write_cached_location(&cache, &location)?;
        Ok(location)
    }

    /// Hourly archive data for `location`, always in UTC.
    pub fn fetch_hourly(&self, location: &GeoLocation, request: &WeatherRequest) -> Result<ArchiveResponse, AppError> {
        let resp = self
            .client
            .get(ARCHIVE_URL)
            .query(&[
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("start_date", request.start_date.to_string()),
                ("end_date", request.end_date.to_string()),
                ("hourly", request.variables.join(",")),
                ("timezone", "UTC".to_string()),
                ("timeformat", "unixtime".to_string()),
            ])
            .send()
            .map_err(|e| AppError::new(EXIT_EXTERNAL, format!("Open-Meteo request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                EXIT_EXTERNAL,
                format!("Open-Meteo request failed with status {}.", resp.status()),
            ));
        }

        resp.json()
            .map_err(|e| AppError::new(EXIT_EXTERNAL, format!("Failed to parse Open-Meteo response: {e}")))
    }
}

/// `<dir>/<city>_<country>_geocode.json`
pub fn geocode_cache_path(dir: &Path, city: &str, country: &str) -> PathBuf {
    dir.join(format!("{city}_{country}_geocode.json"))
}

fn read_cached_location(path: &Path) -> Option<GeoLocation> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<GeoLocation>(&text) {
        Ok(location) if location.validate().is_ok() => Some(location),
        Ok(_) | Err(_) => {
            tracing::warn!(path = %path.display(), "ignoring unreadable geocoding cache");
            None
        }
    }
}

fn write_cached_location(path: &Path, location: &GeoLocation) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(location)
        .map_err(|e| AppError::new(EXIT_EXTERNAL, format!("Failed to encode geocoding cache: {e}")))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PersistenceError::new(parent, e))?;
    }
    std::fs::write(path, json).map_err(|e| PersistenceError::new(path, e))?;
    Ok(())
}

/// Two-column CSV for one variable of an archive response.
///
/// Missing samples become empty cells, which the pipeline rejects as nulls.
pub fn variable_csv(response: &ArchiveResponse, variable: &str) -> Result<String, AppError> {
    if response.utc_offset_seconds != 0 {
        return Err(AppError::new(
            EXIT_EXTERNAL,
            "utc_offset_seconds must be 0 for UTC timezone",
        ));
    }
    let values = response
        .hourly
        .variables
        .get(variable)
        .ok_or_else(|| AppError::new(EXIT_EXTERNAL, format!("Response has no hourly '{variable}' column.")))?;
    if values.len() != response.hourly.time.len() {
        return Err(AppError::new(
            EXIT_EXTERNAL,
            format!(
                "Hourly '{variable}' has {} values for {} timestamps.",
                values.len(),
                response.hourly.time.len()
            ),
        ));
    }

    let mut out = String::from("timestamp,value\n");
    for (&secs, value) in response.hourly.time.iter().zip(values) {
        let ts = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| AppError::new(EXIT_EXTERNAL, format!("Invalid unix timestamp {secs}.")))?;
        out.push_str(&ts.to_rfc3339());
        out.push(',');
        if let Some(v) = value {
            out.push_str(&format!("{v:?}"));
        }
        out.push('\n');
    }
    Ok(out)
}

/// Run every requested variable of `response` through the pipeline.
///
/// The returned outcomes point at `weather_path()`.
pub fn build_series(
    response: &ArchiveResponse,
    request: &WeatherRequest,
    settings: &Settings,
) -> Result<Vec<IngestOutcome>, AppError> {
    let mut weather_settings = settings.with_value_policy(ValuePolicy::Finite);
    if weather_settings.allowed_timezone(Tz::UTC.name()).is_none() {
        weather_settings.allowed_timezones.push(Tz::UTC);
    }
    if !weather_settings.granularities.contains(&Granularity::Hourly) {
        weather_settings.granularities.push(Granularity::Hourly);
    }

    let mut out = Vec::with_capacity(request.variables.len());
    for variable in &request.variables {
        let payload = RawIngestionPayload {
            csv_text: variable_csv(response, variable)?,
            granularity: Granularity::Hourly.as_str().to_string(),
            timezone: Tz::UTC.name().to_string(),
            name: Some(request.series_name(variable)),
        };
        let mut outcome = pipeline::ingest(&payload, &weather_settings)?;
        outcome.storage_path = settings.weather_path().join(&outcome.storage_key);
        out.push(outcome);
    }
    Ok(out)
}
