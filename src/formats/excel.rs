use super::csv::warn_dropped_columns;
use super::{ensure_exists, scalar_text, TableFormat};
use crate::error::{ConvertError, Result};
use crate::types::{ConvertOptions, Record, RecordSet};
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Workbook, Worksheet};
use serde_json::{Number, Value};
use std::path::Path;
use tracing::debug;

const NAME: &str = "excel";

/// Spreadsheet workbooks: first worksheet, first row holds the headers
pub struct ExcelFormat;

impl TableFormat for ExcelFormat {
    fn read(&self, path: &Path, _options: &ConvertOptions) -> Result<RecordSet> {
        ensure_exists(path)?;

        let mut workbook = open_workbook_auto(path).map_err(|err| ConvertError::parse(NAME, path, err))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ConvertError::parse(NAME, path, "workbook has no worksheets"))?
            .map_err(|err| ConvertError::parse(NAME, path, err))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(RecordSet::new());
        };
        let headers: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();

        let records: RecordSet = rows
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| (name.clone(), row.get(idx).map(cell_value).unwrap_or(Value::Null)))
                    .collect::<Record>()
            })
            .collect();

        debug!(rows = records.len(), columns = headers.len(), "read worksheet");
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

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, name) in header.iter().enumerate() {
            let col = column(col, path)?;
            sheet
                .write_string(0, col, name.as_str())
                .map_err(|err| ConvertError::write(path, err))?;
        }

        for (idx, record) in records.iter().enumerate() {
            let row = u32::try_from(idx + 1).map_err(|err| ConvertError::write(path, err))?;
            for (col, key) in header.iter().enumerate() {
                if let Some(value) = record.get(key) {
                    write_cell(sheet, row, column(col, path)?, value)
                        .map_err(|err| ConvertError::write(path, err))?;
                }
            }
        }

        workbook.save(path).map_err(|err| ConvertError::write(path, err))
    }
}

fn column(idx: usize, path: &Path) -> Result<u16> {
    u16::try_from(idx).map_err(|err| ConvertError::write(path, err))
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    match value {
        Value::Null => {}
        Value::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        other => {
            sheet.write_string(row, col, scalar_text(other))?;
        }
    }
    Ok(())
}

/// Largest integer an f64 holds exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_INT => Value::Number((*f as i64).into()),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::HeaderMode;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let records = RecordSet::from(vec![
            record(json!({"name": "Alice", "age": 30, "score": 9.5, "active": true})),
            record(json!({"name": "Bob", "age": null, "extra": "dropped"})),
        ]);

        ExcelFormat.write(&records, &path, &ConvertOptions::default()).unwrap();
        let back = ExcelFormat.read(&path, &ConvertOptions::default()).unwrap();

        assert_eq!(back.len(), 2);
        assert_eq!(back.0[0], records.0[0]);
        let keys: Vec<_> = back.0[1].keys().cloned().collect();
        assert_eq!(keys, vec!["name", "age", "score", "active"]);
        assert_eq!(back.0[1].get("name").unwrap(), "Bob");
        assert!(!back.0[1].contains_key("extra"));
    }

    #[test]
    fn test_union_header_keeps_late_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let records = RecordSet::from(vec![
            record(json!({"a": "x"})),
            record(json!({"a": "y", "b": "z"})),
        ]);
        let options = ConvertOptions {
            header_mode: HeaderMode::Union,
            ..ConvertOptions::default()
        };

        ExcelFormat.write(&records, &path, &options).unwrap();
        let back = ExcelFormat.read(&path, &options).unwrap();

        assert_eq!(back.0[1].get("b").unwrap(), "z");
    }

    #[test]
    fn test_empty_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");

        let err = ExcelFormat
            .write(&RecordSet::new(), &path, &ConvertOptions::default())
            .err()
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::EmptyData);
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_first_record_has_no_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        let records = RecordSet::from(vec![Record::new(), record(json!({"a": 1}))]);

        let err = ExcelFormat
            .write(&records, &path, &ConvertOptions::default())
            .err()
            .unwrap();

        assert_eq!(err.kind(), ErrorKind::EmptyData);
        assert!(!path.exists());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.xlsx");
        std::fs::write(&path, "not a zip archive").unwrap();

        let err = ExcelFormat.read(&path, &ConvertOptions::default()).err().unwrap();

        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), Value::Null);
        assert_eq!(cell_value(&Data::Float(3.0)), json!(3));
        assert_eq!(cell_value(&Data::Float(2.5)), json!(2.5));
        assert_eq!(cell_value(&Data::Int(-4)), json!(-4));
        assert_eq!(cell_value(&Data::String("s".into())), json!("s"));
    }
}
