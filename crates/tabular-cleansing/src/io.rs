//! CSV ingestion and export.
//!
//! Ingestion reads every column as a string so that classification sees the
//! cells exactly as written. Export converts a typed [`Table`] to a polars
//! `DataFrame` and writes it with `CsvWriter`.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CleansingError, Result};
use crate::types::{RawTable, Table};

fn read_options(has_header: bool) -> CsvReadOptions {
    // Schema length 0 keeps every column as String.
    CsvReadOptions::default()
        .with_has_header(has_header)
        .with_infer_schema_length(Some(0))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
}

/// Parse CSV text into a [`RawTable`].
///
/// Headerless input gets polars' default names `column_1..n`. Empty input
/// yields an empty table.
pub fn read_csv_str(text: &str, has_header: bool) -> Result<RawTable> {
    if text.trim().is_empty() {
        return Ok(RawTable::default());
    }

    let cursor = Cursor::new(text.as_bytes().to_vec());
    let df = read_options(has_header)
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| CleansingError::Ingestion(e.to_string()))?;

    dataframe_to_raw(&df)
}

/// Read a CSV file into a [`RawTable`].
pub fn read_csv_file(path: impl AsRef<Path>, has_header: bool) -> Result<RawTable> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CleansingError::Ingestion(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let text = fs::read_to_string(path)?;
    debug!("Read {} bytes from {}", text.len(), path.display());
    read_csv_str(&text, has_header)
}

/// Convert an all-string `DataFrame` into a [`RawTable`]; nulls become "".
fn dataframe_to_raw(df: &DataFrame) -> Result<RawTable> {
    let headers: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = vec![Vec::with_capacity(df.width()); df.height()];
    for column in df.get_columns() {
        let series = column.as_materialized_series().cast(&DataType::String)?;
        let values = series.str()?;
        for (row, value) in rows.iter_mut().zip(values.into_iter()) {
            row.push(value.unwrap_or_default().to_string());
        }
    }

    RawTable::new(headers, rows)
}

/// Write a table as CSV, creating parent directories as needed.
pub fn write_csv(table: &Table, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut df = table.to_dataframe()?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)?;

    info!("Dataset saved: {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, ColumnKind, ColumnSpec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_with_header() {
        let raw = read_csv_str("a,b,label\n1,x,0\n,y,1\n", true).unwrap();
        assert_eq!(raw.headers(), &["a", "b", "label"]);
        assert_eq!(raw.height(), 2);
        assert_eq!(raw.rows()[1], vec!["", "y", "1"]);
    }

    #[test]
    fn test_read_headerless() {
        let raw = read_csv_str("1,2,0\n3,4,1\n5,6,0\n", false).unwrap();
        assert_eq!(raw.headers(), &["column_1", "column_2", "column_3"]);
        assert_eq!(raw.height(), 3);
        assert_eq!(raw.rows()[0], vec!["1", "2", "0"]);
    }

    #[test]
    fn test_numbers_stay_verbatim() {
        let raw = read_csv_str("x,y\n1.50,007\n", true).unwrap();
        assert_eq!(raw.rows()[0], vec!["1.50", "007"]);
    }

    #[test]
    fn test_read_empty_text() {
        let raw = read_csv_str("   \n", true).unwrap();
        assert_eq!(raw.width(), 0);
        assert_eq!(raw.height(), 0);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_csv_file("/definitely/not/here.csv", true).unwrap_err();
        assert_eq!(err.error_code(), "INGESTION_FAILED");
    }

    #[test]
    fn test_write_then_read() {
        let table = Table::new(
            vec![
                ColumnSpec::new("x", ColumnKind::Numeric),
                ColumnSpec::new("color", ColumnKind::Categorical),
            ],
            vec![
                vec![Cell::Number(1.5), Cell::Text("red".into())],
                vec![Cell::Missing, Cell::Text("blue".into())],
            ],
        )
        .unwrap();

        let dir = std::env::temp_dir().join(format!("tabular_cleansing_io_{}", std::process::id()));
        let path = write_csv(&table, dir.join("out.csv")).unwrap();
        let raw = read_csv_file(&path, true).unwrap();

        assert_eq!(raw.headers(), &["x", "color"]);
        assert_eq!(raw.rows()[0], vec!["1.5", "red"]);
        assert_eq!(raw.rows()[1], vec!["", "blue"]);

        fs::remove_dir_all(&dir).ok();
    }
}
