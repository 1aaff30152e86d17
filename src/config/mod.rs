//! Process-wide, read-only settings.
//!
//! Built once at startup (from the environment and an optional `.env` file)
//! and passed by reference into every entry point. Nothing mutates it after
//! construction, so concurrent ingestions share it without locking.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;

use crate::domain::{Granularity, ValuePolicy};
use crate::error::{AppError, EXIT_USAGE};

/// Smallest series length the continuity check can work with.
pub const MIN_POINTS_FLOOR: usize = 3;

const DEFAULT_TIMEZONES: [&str; 2] = ["UTC", "Europe/Paris"];

const DEFAULT_WEATHER_VARIABLES: [&str; 7] = [
    "temperature_2m",
    "relative_humidity_2m",
    "precipitation",
    "wind_speed_10m",
    "wind_direction_10m",
    "cloud_cover",
    "surface_pressure",
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub weather_dir: PathBuf,
    /// Lower-cased, dot-prefixed file extensions accepted for stored series.
    pub supported_extensions: Vec<String>,
    pub allowed_timezones: Vec<Tz>,
    pub granularities: Vec<Granularity>,
    pub min_points: usize,
    pub value_policy: ValuePolicy,
    pub weather_variables: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            raw_dir: PathBuf::from("raw"),
            weather_dir: PathBuf::from("weather"),
            supported_extensions: vec![".csv".to_string()],
            allowed_timezones: DEFAULT_TIMEZONES.iter().filter_map(|name| name.parse().ok()).collect(),
            granularities: Granularity::ALL.to_vec(),
            min_points: MIN_POINTS_FLOOR,
            value_policy: ValuePolicy::Positive,
            weather_variables: DEFAULT_WEATHER_VARIABLES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("DATA_DIR") {
            settings.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("RAW_DIR") {
            settings.raw_dir = PathBuf::from(v);
        }
        if let Some(v) = get("WEATHER_DIR") {
            settings.weather_dir = PathBuf::from(v);
        }

        if let Some(v) = get("SUPPORTED_FILE_EXTENSIONS") {
            settings.supported_extensions = split_list(&v)
                .map(|ext| {
                    let ext = ext.to_ascii_lowercase();
                    if ext.starts_with('.') { ext } else { format!(".{ext}") }
                })
                .collect();
        }

        if let Some(v) = get("ALLOWED_TIMEZONES") {
            settings.allowed_timezones = split_list(&v)
                .map(|name| {
                    name.parse::<Tz>().map_err(|_| {
                        AppError::new(EXIT_USAGE, format!("ALLOWED_TIMEZONES: unknown IANA timezone '{name}'."))
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(v) = get("GRANULARITIES") {
            settings.granularities = split_list(&v)
                .map(|name| {
                    Granularity::from_name(&name.to_ascii_lowercase()).ok_or_else(|| {
                        AppError::new(
                            EXIT_USAGE,
                            format!("GRANULARITIES: unknown granularity '{name}' (known: hourly, daily, monthly)."),
                        )
                    })
                })
                .collect::<Result<_, _>>()?;
        }

        if let Some(v) = get("MIN_POINTS") {
            let n: usize = v
                .parse()
                .map_err(|_| AppError::new(EXIT_USAGE, format!("MIN_POINTS: '{v}' is not a non-negative integer.")))?;
            if n < MIN_POINTS_FLOOR {
                return Err(AppError::new(
                    EXIT_USAGE,
                    format!("MIN_POINTS must be at least {MIN_POINTS_FLOOR} (got {n})."),
                ));
            }
            settings.min_points = n;
        }

        if let Some(v) = get("VALUE_POLICY") {
            settings.value_policy = ValuePolicy::from_name(&v).ok_or_else(|| {
                AppError::new(EXIT_USAGE, format!("VALUE_POLICY: expected `positive` or `finite`, got '{v}'."))
            })?;
        }

        if let Some(v) = get("WEATHER_VARIABLES") {
            settings.weather_variables = split_list(&v).map(str::to_string).collect();
        }

        if settings.allowed_timezones.is_empty() {
            return Err(AppError::new(EXIT_USAGE, "ALLOWED_TIMEZONES must not be empty."));
        }
        if settings.granularities.is_empty() {
            return Err(AppError::new(EXIT_USAGE, "GRANULARITIES must not be empty."));
        }

        Ok(settings)
    }

    /// Same settings with a different value policy.
    pub fn with_value_policy(&self, policy: ValuePolicy) -> Self {
        Self {
            value_policy: policy,
            ..self.clone()
        }
    }

    /// `<data_dir>/<raw_dir>`: where ingested series are stored.
    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(&self.raw_dir)
    }

    /// `<data_dir>/<raw_dir>/<weather_dir>`: weather series and geocoding cache.
    pub fn weather_path(&self) -> PathBuf {
        self.raw_path().join(&self.weather_dir)
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.data_dir.clone(), self.raw_path(), self.weather_path()] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    pub fn granularity_options(&self) -> Vec<&'static str> {
        self.granularities.iter().map(|g| g.as_str()).collect()
    }

    pub fn timezone_options(&self) -> Vec<&'static str> {
        self.allowed_timezones.iter().map(|tz| tz.name()).collect()
    }

    /// Exact-name lookup in the allow-list.
    pub fn allowed_timezone(&self, name: &str) -> Option<Tz> {
        self.allowed_timezones.iter().copied().find(|tz| tz.name() == name)
    }

    pub fn is_supported_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_ascii_lowercase());
        self.supported_extensions.iter().any(|s| *s == ext)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
