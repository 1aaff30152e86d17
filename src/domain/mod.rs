//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`Granularity`, `ValuePolicy`) and `Frequency`
//! - per-stage frames (`NormalizedFrame`, `ResolvedFrame`)
//! - validated outputs (`ValidatedTimeSeries`, `TimeSeriesData`)

pub mod types;

pub use types::*;
