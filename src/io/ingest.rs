//! CSV parsing: raw text to a two-column frame.
//!
//! This is the first pipeline stage. It only checks the shape of the table:
//! - a header row with a column named exactly `timestamp`
//! - exactly two columns; the other one is relabelled `value`
//!
//! Row order is preserved and cell contents are left as text. Timestamps and
//! values are interpreted by later stages.

use csv::StringRecord;

use crate::domain::{NormalizedFrame, RawRow, TIMESTAMP_LABEL, VALUE_LABEL};
use crate::error::IngestError;

/// Parse CSV text into a [`NormalizedFrame`].
///
/// A row with fewer cells than the header is read as having an empty value
/// cell, which the value checks report as a null. A row with more cells is a
/// parse error.
pub fn parse_csv_text(text: &str) -> Result<NormalizedFrame, IngestError> {
    let body = text.trim_start();
    // Line numbers refer to the text as submitted, before trimming.
    let skipped_lines = text[..text.len() - body.len()].matches('\n').count();
    let text = body.trim_end();
    if text.is_empty() {
        return Err(IngestError::Parse("Failed to convert raw CSV text to a table: input is empty.".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Parse(format!("Failed to read CSV header: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let (ts_idx, value_idx) = locate_columns(&headers)?;

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(IngestError::Parse(format!("Failed to parse CSV: {e}"))),
        }
        // Header is line 1; `position()` reports the record's starting line.
        let line = record.position().map(|p| p.line() as usize).unwrap_or(rows.len() + 2) + skipped_lines;
        if record.len() > headers.len() {
            return Err(IngestError::Parse(format!(
                "Line {line}: expected {} fields, found {}.",
                headers.len(),
                record.len()
            )));
        }
        rows.push(RawRow {
            line,
            timestamp: record.get(ts_idx).unwrap_or_default().to_string(),
            value: record.get(value_idx).unwrap_or_default().to_string(),
        });
    }

    Ok(NormalizedFrame {
        source_label: headers[value_idx].clone(),
        rows,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often start with a UTF-8 BOM; without stripping it
    // the `timestamp` header would not be found.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Return `(timestamp_index, value_index)`.
fn locate_columns(headers: &[String]) -> Result<(usize, usize), IngestError> {
    let Some(ts_idx) = headers.iter().position(|h| h == TIMESTAMP_LABEL) else {
        return Err(IngestError::Schema("CSV must contain a 'timestamp' column.".to_string()));
    };
    if headers.len() != 2 {
        return Err(IngestError::Schema(format!(
            "CSV must contain exactly two columns: timestamp and value. Found: {headers:?}"
        )));
    }
    let value_idx = 1 - ts_idx;
    if headers[value_idx] == TIMESTAMP_LABEL {
        return Err(IngestError::Schema(
            "CSV must contain exactly one 'timestamp' column and one data column.".to_string(),
        ));
    }
    if !headers[value_idx].eq_ignore_ascii_case(VALUE_LABEL) {
        tracing::debug!(from = %headers[value_idx], "relabelling data column to `value`");
    }
    Ok((ts_idx, value_idx))
}
