//! `ts-ingest` library crate.
//!
//! The binary (`tsi`) is a thin wrapper around this library so that:
//!
//! - the validation pipeline is testable without spawning processes
//! - other front-ends (services, batch jobs) can reuse the same contract
//! - every stage lives in its own module

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod validate;
