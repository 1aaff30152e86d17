//! Validation stages run after CSV parsing.
//!
//! - timezone allow-list + timestamp resolution (`timezone`)
//! - declared granularity (`granularity`)
//! - frequency inference + grid equality (`continuity`)
//! - length + value domain (`values`)

pub mod continuity;
pub mod granularity;
pub mod timezone;
pub mod values;

pub use continuity::{check_continuity, infer_frequency};
pub use granularity::check_granularity;
pub use timezone::{check_timezone, resolve_timestamps};
pub use values::{check_length, coerce_values};
