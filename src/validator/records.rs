//! CSV to JSON record conversion.

use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading a CSV file into records.
#[derive(Debug, Error)]
pub enum CsvRecordsError {
    #[error("failed to read CSV headers: {0}")]
    Headers(#[source] csv::Error),

    #[error("failed to parse CSV row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("CSV file has no header row")]
    NoHeader,

    #[error("CSV file has no data rows")]
    Empty,

    #[error("failed to open CSV file: {0}")]
    Open(#[source] csv::Error),
}

/// Reads a CSV file with a header row into JSON objects keyed by header.
///
/// Cell values are kept as strings. Rows shorter than the header omit the
/// missing columns; extra cells beyond the header are dropped.
pub fn read_csv_records(path: &Path) -> Result<Vec<Value>, CsvRecordsError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .flexible(true)
        .from_path(path)
        .map_err(CsvRecordsError::Open)?;

    let headers = reader.headers().map_err(CsvRecordsError::Headers)?.clone();
    if headers.is_empty() {
        return Err(CsvRecordsError::NoHeader);
    }

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|source| CsvRecordsError::Row {
            row: index + 1,
            source,
        })?;

        let object: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(Value::Object(object));
    }

    if records.is_empty() {
        return Err(CsvRecordsError::Empty);
    }
    Ok(records)
}
