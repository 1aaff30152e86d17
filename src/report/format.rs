//! Terminal and JSON output for ingestions and audits.
//!
//! Formatting lives here so pipeline code never builds strings for humans.

use serde::Serialize;

use crate::app::pipeline::{IngestOutcome, StoredOutcome};
use crate::config::Settings;
use crate::io::stored::AuditEntry;

pub const UPLOADED_MESSAGE: &str = "Timeseries data uploaded successfully.";
pub const DRY_RUN_MESSAGE: &str = "Timeseries data is valid (dry run, nothing written).";

/// Result of one accepted ingestion, shaped like the upload response.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub message: String,
    pub data_points: usize,
    pub name: String,
    pub granularity: String,
    pub timezone: String,
    pub csv: String,
    pub file_path: String,
    pub file_written: bool,
}

impl IngestReport {
    pub fn stored(stored: &StoredOutcome) -> Self {
        Self {
            message: UPLOADED_MESSAGE.to_string(),
            file_path: stored.file_path.display().to_string(),
            file_written: stored.file_written,
            ..Self::base(&stored.outcome)
        }
    }

    pub fn dry_run(outcome: &IngestOutcome) -> Self {
        Self {
            message: DRY_RUN_MESSAGE.to_string(),
            ..Self::base(outcome)
        }
    }

    fn base(outcome: &IngestOutcome) -> Self {
        let series = &outcome.series;
        Self {
            message: String::new(),
            data_points: series.len(),
            name: series.name().to_string(),
            granularity: series.granularity().to_string(),
            timezone: series.timezone().map(|tz| tz.name().to_string()).unwrap_or_default(),
            csv: outcome.csv.clone(),
            file_path: outcome.storage_path.display().to_string(),
            file_written: false,
        }
    }
}

/// One audited file.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    pub path: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_points: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&AuditEntry> for AuditRow {
    fn from(entry: &AuditEntry) -> Self {
        let path = entry.path.display().to_string();
        match &entry.result {
            Ok(ok) => Self {
                path,
                ok: true,
                name: Some(ok.name.clone()),
                granularity: Some(ok.granularity.clone()),
                data_points: Some(ok.data_points),
                error_kind: None,
                error: None,
            },
            Err(err) => Self {
                path,
                ok: false,
                name: None,
                granularity: None,
                data_points: None,
                error_kind: Some(err.kind().to_string()),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Short human summary of an accepted ingestion (no CSV body).
pub fn format_ingest_summary(report: &IngestReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", report.message));
    out.push_str(&format!("Series: {} ({})\n", report.name, report.granularity));
    out.push_str(&format!("Timezone: {}\n", report.timezone));
    out.push_str(&format!("Points: {}\n", report.data_points));
    let written = if report.file_written { "written" } else { "not written" };
    out.push_str(&format!("File: {} ({written})\n", report.file_path));
    out
}

/// Fixed-width audit table followed by a one-line tally.
pub fn format_audit(rows: &[AuditRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!("{:<40} {:<6} {:>8} {:<20}\n", "file", "status", "points", "detail").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<40} {:-<6} {:->8} {:-<20}\n", "", "", "", "").trim_end());
    out.push('\n');

    for row in rows {
        let file = row
            .path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(row.path.as_str());
        let (status, points, detail) = if row.ok {
            (
                "ok",
                row.data_points.map(|n| n.to_string()).unwrap_or_default(),
                row.granularity.clone().unwrap_or_default(),
            )
        } else {
            (
                "FAIL",
                String::new(),
                format!(
                    "{}: {}",
                    row.error_kind.as_deref().unwrap_or("Error"),
                    row.error.as_deref().unwrap_or("")
                ),
            )
        };
        out.push_str(format!("{:<40} {:<6} {:>8} {}\n", truncate(file, 40), status, points, detail).trim_end());
        out.push('\n');
    }

    let failed = rows.iter().filter(|r| !r.ok).count();
    out.push_str(&format!("\n{} file(s), {} failed\n", rows.len(), failed));
    out
}

/// `hourly  1h` style listing of the configured granularities.
pub fn format_granularities(settings: &Settings) -> String {
    let mut out = String::new();
    for g in &settings.granularities {
        out.push_str(&format!("{:<8} {}\n", g.as_str(), g.frequency()));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::RawIngestionPayload;
    use crate::error::{IngestError, StoredSeriesError};
    use crate::io::stored::AuditOk;

    fn outcome() -> IngestOutcome {
        let payload = RawIngestionPayload {
            csv_text: "timestamp,value\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n".into(),
            granularity: "daily".into(),
            timezone: "Europe/Paris".into(),
            name: Some("load".into()),
        };
        crate::app::pipeline::ingest(&payload, &Settings::default()).unwrap()
    }

    #[test]
    fn dry_run_report_points_at_expected_path() {
        let report = IngestReport::dry_run(&outcome());
        assert_eq!(report.data_points, 3);
        assert_eq!(report.timezone, "Europe/Paris");
        assert!(!report.file_written);
        assert_eq!(PathBuf::from(&report.file_path), PathBuf::from("data/raw/load_daily.csv"));

        let json = serde_json::to_value(&report).unwrap();
        for key in ["message", "data_points", "csv", "file_path", "file_written"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn summary_mentions_series_and_file() {
        let text = format_ingest_summary(&IngestReport::dry_run(&outcome()));
        assert!(text.contains("Series: load (daily)"));
        assert!(text.contains("Points: 3"));
        assert!(text.contains("(not written)"));
    }

    #[test]
    fn audit_table_lists_failures() {
        let entries = vec![
            AuditEntry {
                path: PathBuf::from("data/raw/load_daily.csv"),
                result: Ok(AuditOk {
                    name: "load".into(),
                    granularity: "daily".into(),
                    data_points: 31,
                }),
            },
            AuditEntry {
                path: PathBuf::from("data/raw/bad_hourly.csv"),
                result: Err(StoredSeriesError::from(IngestError::ValueDomain(
                    "Data column contains null values.".into(),
                ))),
            },
        ];
        let rows: Vec<AuditRow> = entries.iter().map(AuditRow::from).collect();
        assert!(rows[0].ok);
        assert_eq!(rows[1].error_kind.as_deref(), Some("ValueDomainError"));

        let table = format_audit(&rows);
        assert!(table.contains("load_daily.csv"));
        assert!(table.contains("FAIL"));
        assert!(table.ends_with("2 file(s), 1 failed\n"));
    }

    #[test]
    fn granularity_listing_uses_frequency_tokens() {
        let text = format_granularities(&Settings::default());
        assert_eq!(text, "hourly   1h\ndaily    1D\nmonthly  1MS\n");
    }
}
