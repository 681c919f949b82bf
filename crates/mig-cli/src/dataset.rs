//! CSV datasets in and out of the pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, WriterBuilder};
use mig_model::{Record, RecordId, Value};
use tracing::{Level, debug, trace};

use crate::logging::redact_value;

/// How to read a dataset.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub id_column: Option<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            id_column: None,
        }
    }
}

/// Find `<entity>.csv` in `dir`, matching the file stem case-insensitively.
pub fn find_dataset(dir: &Path, entity: &str) -> Result<Option<PathBuf>> {
    let exact = dir.join(format!("{entity}.csv"));
    if exact.is_file() {
        return Ok(Some(exact));
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("read data directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("read data directory: {}", dir.display()))?
            .path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let stem_matches = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem.eq_ignore_ascii_case(entity));
        if is_csv && stem_matches {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Read a CSV file into records. Empty cells become [`Value::Null`]; other
/// cells stay text.
///
/// Rows are identified by `id_column` when it is set and non-empty, and by
/// their 1-based row position otherwise.
pub fn read_records(path: &Path, options: &CsvOptions) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("read csv: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("read headers: {}", path.display()))?
        .iter()
        .map(|header| header.trim_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().any(String::is_empty) {
        bail!("empty column name in {}", path.display());
    }
    if let Some(id_column) = &options.id_column
        && !headers.iter().any(|h| h == id_column)
    {
        bail!("id column {id_column:?} not found in {}", path.display());
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("read record: {}", path.display()))?;
        let position = index + 1;
        let mut id = None;
        let mut record = Record::new(RecordId::from_row(position));
        for (header, cell) in headers.iter().zip(row.iter()) {
            if options.id_column.as_deref() == Some(header.as_str()) && !cell.is_empty() {
                id = Some(cell.to_string());
            }
            let value = if cell.is_empty() {
                Value::Null
            } else {
                Value::from(cell)
            };
            record.insert(header.clone(), value);
        }
        if let Some(id) = id {
            record.id = RecordId::new(id)
                .with_context(|| format!("row {position} of {}", path.display()))?;
        }
        if tracing::enabled!(Level::TRACE) {
            let values = format!("{:?}", record.values);
            trace!(record = %record.id, values = redact_value(&values), "record loaded");
        }
        records.push(record);
    }

    debug!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(records)
}

/// Write records as CSV with `id_header` first, when given, and `columns`
/// after it, in order. Null values are written as empty cells.
pub fn write_records(
    path: &Path,
    id_header: Option<&str>,
    columns: &[String],
    records: &[Record],
    delimiter: u8,
) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("create csv: {}", path.display()))?;

    let mut header = Vec::with_capacity(columns.len() + 1);
    header.extend(id_header);
    header.extend(columns.iter().map(String::as_str));
    writer
        .write_record(&header)
        .with_context(|| format!("write headers: {}", path.display()))?;

    for record in records {
        let mut row = Vec::with_capacity(columns.len() + 1);
        if id_header.is_some() {
            row.push(record.id.as_str().to_string());
        }
        row.extend(columns.iter().map(|column| record.get(column).to_string()));
        writer
            .write_record(&row)
            .with_context(|| format!("write record {}: {}", record.id, path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush csv: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_become_null_and_ids_come_from_the_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.csv");
        std::fs::write(&path, "\u{feff}id,email,age\nc-1,a@x.io,31\n,,\n").unwrap();

        let records = read_records(
            &path,
            &CsvOptions {
                delimiter: b',',
                id_column: Some("id".into()),
            },
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_str(), "c-1");
        assert_eq!(records[0].get("age"), &Value::from("31"));
        assert_eq!(records[1].id, RecordId::from_row(2));
        assert!(records[1].get("email").is_null());
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        std::fs::write(&path, "sku\nA\n").unwrap();

        let options = CsvOptions {
            delimiter: b',',
            id_column: Some("order_id".into()),
        };
        let err = read_records(&path, &options).unwrap_err();
        assert!(err.to_string().contains("order_id"));
    }

    #[test]
    fn dataset_lookup_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Customers.CSV"), "id\n").unwrap();
        let found = find_dataset(dir.path(), "customers").unwrap();
        assert!(found.is_some());
        assert!(find_dataset(dir.path(), "orders").unwrap().is_none());
    }

    #[test]
    fn written_rows_follow_the_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let records = vec![
            Record::new(RecordId::from_row(1))
                .with("name", "Ada")
                .with("email", Value::Null),
        ];
        write_records(
            &path,
            Some("record_id"),
            &["email".to_string(), "name".to_string()],
            &records,
            b',',
        )
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "record_id,email,name\n1,,Ada\n");

        write_records(&path, None, &["name".to_string()], &records, b';').unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "name\nAda\n");
    }
}
