//! Input/output helpers.
//!
//! - CSV parsing into a normalized frame (`ingest`)
//! - canonical CSV rendering + storage keys (`export`)
//! - atomic per-key persistence (`store`)
//! - reading persisted series back + directory audit (`stored`)

pub mod export;
pub mod ingest;
pub mod store;
pub mod stored;

pub use export::{render_csv, storage_key, storage_path};
pub use ingest::parse_csv_text;
pub use store::{FsStore, SeriesStore};
pub use stored::{audit_directory, load_stored_series};
