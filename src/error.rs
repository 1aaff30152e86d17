//! Error types.
//!
//! - `IngestError`: one variant per validation failure kind. These are
//!   deterministic outcomes of the pipeline and are never retried.
//! - `PersistenceError`: writing a rendered series failed (disk full,
//!   permission denied, ...). Kept apart from validation failures.
//! - `StoredSeriesError`: reading a persisted series back failed.
//! - `AppError`: what the binary prints, with its process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code for usage, configuration, and unreadable input problems.
pub const EXIT_USAGE: u8 = 2;
/// Exit code for validation failures.
pub const EXIT_INVALID: u8 = 3;
/// Exit code for persistence and external service failures.
pub const EXIT_EXTERNAL: u8 = 4;

/// A validation failure raised by one of the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// Wrong column count or missing `timestamp` column.
    #[error("{0}")]
    Schema(String),
    /// CSV text or a timestamp value could not be parsed.
    #[error("{0}")]
    Parse(String),
    /// Declared timezone is not in the allow-list.
    #[error("{0}")]
    Timezone(String),
    /// Declared granularity is not supported.
    #[error("{0}")]
    Granularity(String),
    /// Frequency could not be inferred, or the index is not the full grid.
    #[error("{0}")]
    Continuity(String),
    /// Non-numeric, null, or out-of-policy values; or too few points.
    #[error("{0}")]
    ValueDomain(String),
    /// Empty or unusable series name.
    #[error("{0}")]
    Name(String),
}

impl IngestError {
    /// Stable label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Schema(_) => "SchemaError",
            IngestError::Parse(_) => "ParseError",
            IngestError::Timezone(_) => "TimezoneError",
            IngestError::Granularity(_) => "GranularityError",
            IngestError::Continuity(_) => "ContinuityError",
            IngestError::ValueDomain(_) => "ValueDomainError",
            IngestError::Name(_) => "NameError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            IngestError::Schema(m)
            | IngestError::Parse(m)
            | IngestError::Timezone(m)
            | IngestError::Granularity(m)
            | IngestError::Continuity(m)
            | IngestError::ValueDomain(m)
            | IngestError::Name(m) => m,
        }
    }
}

/// Writing a rendered series to its storage location failed.
#[derive(Debug, Error)]
#[error("failed to persist '{}': {source}", path.display())]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl PersistenceError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

/// Reading a persisted series back failed.
#[derive(Debug, Error)]
pub enum StoredSeriesError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file extension of '{}' is not supported; supported extensions: {supported:?}", path.display())]
    UnsupportedExtension { path: PathBuf, supported: Vec<String> },
    #[error("could not extract name and granularity from file name '{0}'")]
    FileName(String),
    #[error("timestamps in '{}' do not match any allowed timezone", path.display())]
    UnknownTimezone { path: PathBuf },
    #[error("{}: {source}", source.kind())]
    Invalid {
        #[from]
        source: IngestError,
    },
}

impl StoredSeriesError {
    /// Stable label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StoredSeriesError::Io { .. } => "IoError",
            StoredSeriesError::UnsupportedExtension { .. } => "ExtensionError",
            StoredSeriesError::FileName(_) => "FileNameError",
            StoredSeriesError::UnknownTimezone { .. } => "TimezoneError",
            StoredSeriesError::Invalid { source } => source.kind(),
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::new(EXIT_INVALID, format!("{}: {}", err.kind(), err.message()))
    }
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        AppError::new(EXIT_EXTERNAL, format!("PersistenceError: {err}"))
    }
}

impl From<StoredSeriesError> for AppError {
    fn from(err: StoredSeriesError) -> Self {
        match err {
            StoredSeriesError::Io { .. } => AppError::new(EXIT_USAGE, err.to_string()),
            other => AppError::new(EXIT_INVALID, other.to_string()),
        }
    }
}
