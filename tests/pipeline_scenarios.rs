use ts_ingest::app::pipeline::{ingest, ingest_and_store, validate};
use ts_ingest::config::Settings;
use ts_ingest::domain::{Frequency, Granularity, RawIngestionPayload};
use ts_ingest::error::{EXIT_INVALID, IngestError};
use ts_ingest::io::stored::{audit_directory, load_stored_series};
use ts_ingest::io::store::FsStore;

const HOURLY_5: &str = "timestamp,value\n\
    2024-01-01 00:00:00,10\n\
    2024-01-01 01:00:00,11\n\
    2024-01-01 02:00:00,12\n\
    2024-01-01 03:00:00,13\n\
    2024-01-01 04:00:00,14\n";

fn payload(csv_text: &str, granularity: &str, timezone: &str) -> RawIngestionPayload {
    RawIngestionPayload {
        csv_text: csv_text.to_string(),
        granularity: granularity.to_string(),
        timezone: timezone.to_string(),
        name: None,
    }
}

fn settings_in(dir: &std::path::Path) -> Settings {
    Settings {
        data_dir: dir.to_path_buf(),
        ..Settings::default()
    }
}

#[test]
fn five_hourly_rows_are_accepted() {
    let out = ingest(&payload(HOURLY_5, "hourly", "UTC"), &Settings::default()).unwrap();
    assert_eq!(out.series.len(), 5);
    assert_eq!(out.series.granularity(), Granularity::Hourly);
    assert_eq!(out.storage_key, "y_hourly.csv");
}

#[test]
fn removed_middle_row_breaks_continuity() {
    let text: String = HOURLY_5
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 3)
        .map(|(_, l)| format!("{l}\n"))
        .collect();
    let err = validate(&payload(&text, "hourly", "UTC"), &Settings::default()).unwrap_err();
    assert_eq!(
        err,
        IngestError::Continuity("Index frequency could not be inferred; data may be irregular.".into())
    );
}

#[test]
fn text_value_is_not_numeric() {
    let text = HOURLY_5.replace(",12\n", ",abc\n");
    let err = validate(&payload(&text, "hourly", "UTC"), &Settings::default()).unwrap_err();
    assert_eq!(err, IngestError::ValueDomain("Data column must be numeric.".into()));
}

#[test]
fn missing_value_cell_is_a_null() {
    let text = "timestamp,value\n2024-01-01,1\n2024-01-02\n2024-01-03,3\n";
    let err = validate(&payload(text, "daily", "UTC"), &Settings::default()).unwrap_err();
    assert_eq!(err, IngestError::ValueDomain("Data column contains null values.".into()));
}

#[test]
fn duplicate_within_minimum_length_is_missing_dates() {
    let text = "timestamp,value\n2024-01-01,1\n2024-01-01,2\n2024-01-02,3\n";
    let err = validate(&payload(text, "daily", "UTC"), &Settings::default()).unwrap_err();
    assert_eq!(
        err,
        IngestError::Continuity("Index frequency could be inferred, but missing dates.".into())
    );
}

#[test]
fn weekly_granularity_lists_allowed_set() {
    let err = validate(&payload(HOURLY_5, "weekly", "UTC"), &Settings::default()).unwrap_err();
    let IngestError::Granularity(msg) = err else {
        panic!("expected a granularity error, got {err:?}");
    };
    for g in ["hourly", "daily", "monthly"] {
        assert!(msg.contains(g), "{msg}");
    }
}

#[test]
fn disallowed_timezone_wins_over_malformed_csv() {
    let err = validate(&payload("\"unterminated,,,\n1,2,3,4", "hourly", "Asia/Tokyo"), &Settings::default()).unwrap_err();
    assert!(matches!(err, IngestError::Timezone(ref m) if m.contains("Asia/Tokyo")));

    let err = validate(&payload(HOURLY_5, "hourly", "Asia/Tokyo"), &Settings::default()).unwrap_err();
    assert_eq!(err.kind(), "TimezoneError");
}

#[test]
fn three_columns_is_a_schema_error() {
    let text = "timestamp,value,extra\n2024-01-01,1,2\n2024-01-02,1,2\n2024-01-03,1,2\n";
    let err = validate(&payload(text, "daily", "UTC"), &Settings::default()).unwrap_err();
    assert!(matches!(err, IngestError::Schema(ref m) if m.contains("exactly two columns")));
}

#[test]
fn length_boundary() {
    let three = "timestamp,value\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n";
    let ok = validate(&payload(three, "daily", "UTC"), &Settings::default()).unwrap();
    assert_eq!(ok.frequency(), Frequency::Days(1));

    let two = "timestamp,value\n2024-01-01,1\n2024-01-02,2\n";
    let err = validate(&payload(two, "daily", "UTC"), &Settings::default()).unwrap_err();
    assert_eq!(
        err,
        IngestError::ValueDomain("Data must contain at least 3 data points, found 2.".into())
    );
}

#[test]
fn offset_input_is_converted_into_declared_zone() {
    let text = "timestamp,value\n\
        2024-01-01T00:00:00Z,1\n\
        2024-01-01T01:00:00Z,2\n\
        2024-01-01T02:00:00Z,3\n";
    let out = ingest(&payload(text, "hourly", "Europe/Paris"), &Settings::default()).unwrap();
    assert!(out.csv.contains("2024-01-01 01:00:00+01:00,1.0\n"));
    assert!(out.csv.contains("2024-01-01 03:00:00+01:00,3.0\n"));
}

#[test]
fn canonical_output_is_idempotent() {
    let text = "timestamp,load\n2024-03-30,1.5\n2024-03-31,2.25\n2024-04-01,3\n2024-04-02,4.125\n";
    let first = ingest(&payload(text, "daily", "Europe/Paris"), &Settings::default()).unwrap();
    let second = ingest(&payload(&first.csv, "daily", "Europe/Paris"), &Settings::default()).unwrap();
    assert_eq!(first.csv, second.csv);
    assert_eq!(first.series, second.series);
    assert!(first.csv.contains("2024-03-31 00:00:00+01:00,2.25\n"));
    assert!(first.csv.contains("2024-04-01 00:00:00+02:00,3.0\n"));
}

#[test]
fn stored_series_reload_and_audit() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let store = FsStore::new(settings.raw_path());

    let mut named = payload(
        "timestamp,value\n2024-01-01,5\n2024-02-01,6\n2024-03-01,7\n",
        "monthly",
        "Europe/Paris",
    );
    named.name = Some("site_a".into());
    let stored = ingest_and_store(&named, &settings, &store).unwrap();
    assert!(stored.file_written);
    assert_eq!(stored.file_path, settings.raw_path().join("site_a_monthly.csv"));

    let reloaded = load_stored_series(&stored.file_path, &settings).unwrap();
    assert_eq!(reloaded, stored.outcome.series);

    std::fs::write(
        settings.raw_path().join("broken_daily.csv"),
        "timestamp,value\n2024-01-01 00:00:00+00:00,1.0\n2024-01-03 00:00:00+00:00,2.0\n2024-01-04 00:00:00+00:00,3.0\n2024-01-05 00:00:00+00:00,4.0\n",
    )
    .unwrap();
    std::fs::write(settings.raw_path().join("notes.txt"), "ignored").unwrap();

    let entries = audit_directory(&settings.raw_path(), &settings).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].path.ends_with("broken_daily.csv"));
    assert_eq!(entries[0].result.as_ref().unwrap_err().kind(), "ContinuityError");
    let ok = entries[1].result.as_ref().unwrap();
    assert_eq!((ok.name.as_str(), ok.granularity.as_str(), ok.data_points), ("site_a", "monthly", 3));
}

#[test]
fn rejected_payload_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let store = FsStore::new(settings.raw_path());

    let text = HOURLY_5.replace(",12\n", ",-3\n");
    let err = ingest_and_store(&payload(&text, "hourly", "UTC"), &settings, &store).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_INVALID);
    assert!(err.to_string().starts_with("ValueDomainError: Data column contains non-positive values."));
    assert!(!settings.raw_path().exists());
}
