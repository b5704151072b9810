//! CSV loading for the membership change report.
//!
//! The export has one row per membership change with at least the `Date`,
//! `To` and `Cost` columns.  Rows become [`TransactionRecord`]s; the cost is
//! kept verbatim because numeric coercion belongs to the aggregator.

use std::io::Read;
use std::path::Path;

use csv::Trim;
use report_core::error::{ReportError, Result};
use report_core::models::TransactionRecord;
use report_core::time_utils::parse_report_date;
use serde::Deserialize;
use tracing::debug;

/// Raw CSV row as exported by the membership system.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "To")]
    to: String,
    #[serde(rename = "Cost", default)]
    cost: String,
}

/// Parse a CSV export from any reader.
///
/// Headers are required; unknown columns are ignored and blank lines skipped.
/// A row whose `Date` cannot be read as a calendar day aborts the whole parse.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<TransactionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        // Line 1 is the header.
        let line = index + 2;
        let row = row.map_err(|e| ReportError::Csv(e.to_string()))?;

        let date = parse_report_date(&row.date).ok_or_else(|| {
            ReportError::Parse(format!("row {line}: invalid date \"{}\"", row.date))
        })?;

        records.push(TransactionRecord {
            date,
            from_type: row.from,
            to_type: row.to,
            cost: row.cost,
        });
    }

    debug!("Parsed {} report rows", records.len());
    Ok(records)
}

/// Parse a CSV export held in memory (e.g. an HTTP response body).
pub fn parse_records_str(body: &str) -> Result<Vec<TransactionRecord>> {
    parse_records(body.as_bytes())
}

/// Read a CSV export from disk.
pub fn read_records_file(path: &Path) -> Result<Vec<TransactionRecord>> {
    let file = std::fs::File::open(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(std::io::BufReader::new(file))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
