//! Reporting utilities: ingest summaries, audit tables, granularity listing.

pub mod format;

pub use format::*;
