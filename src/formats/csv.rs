use super::{create_target, open_source, scalar_text, TableFormat};
use crate::error::{ConvertError, Result};
use crate::types::{ConvertOptions, Record, RecordSet};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

const NAME: &str = "csv";

/// Comma-separated values with a header row
///
/// Every cell is read as a string; no type inference is attempted.
pub struct CsvFormat;

impl TableFormat for CsvFormat {
    fn read(&self, path: &Path, _options: &ConvertOptions) -> Result<RecordSet> {
        let file = open_source(path)?;
        let mut reader = ::csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let classify = |err: ::csv::Error| {
            if err.is_io_error() {
                ConvertError::unknown(path, err)
            } else {
                ConvertError::parse(NAME, path, err)
            }
        };

        let headers = reader.headers().map_err(classify)?.clone();
        let mut records = RecordSet::new();

        for (row, result) in reader.records().enumerate() {
            let fields = result.map_err(classify)?;
            if fields.len() > headers.len() {
                warn!(
                    row = row + 1,
                    dropped = fields.len() - headers.len(),
                    "row has more fields than the header, extra fields dropped"
                );
            }

            let record: Record = headers
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let value = fields
                        .get(idx)
                        .map(|field| Value::String(field.to_string()))
                        .unwrap_or(Value::Null);
                    (name.to_string(), value)
                })
                .collect();
            records.push(record);
        }

        debug!(rows = records.len(), columns = headers.len(), "read csv");
        Ok(records)
    }

    fn write(&self, records: &RecordSet, path: &Path, options: &ConvertOptions) -> Result<()> {
        if records.is_empty() {
            return Err(ConvertError::EmptyData { format: NAME });
        }

        let header = records.header(options.header_mode);
        warn_dropped_columns(records, &header);
        if header.is_empty() {
            return Err(ConvertError::EmptyData { format: NAME });
        }

        let mut writer = ::csv::Writer::from_writer(create_target(path)?);
        writer
            .write_record(&header)
            .map_err(|err| ConvertError::write(path, err))?;

        for record in records {
            let row = header
                .iter()
                .map(|key| record.get(key).map(scalar_text).unwrap_or_default());
            writer
                .write_record(row)
                .map_err(|err| ConvertError::write(path, err))?;
        }

        writer.flush().map_err(|err| ConvertError::write(path, err))
    }
}

/// Log keys that have no column in the chosen header
pub(crate) fn warn_dropped_columns(records: &RecordSet, header: &[String]) {
    let mut dropped: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.contains(key) && !dropped.contains(&key.as_str()) {
                dropped.push(key);
            }
        }
    }
    if !dropped.is_empty() {
        warn!(columns = ?dropped, "keys missing from the first record are dropped from tabular output");
    }
}
