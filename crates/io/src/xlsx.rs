// Excel import (xlsx, xls, xlsb, ods) and export (xlsx only)
//
// Import: first worksheet only. The extracts this tool consumes are
// single-table workbooks, often with banner rows above the headers.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use log::debug;
use rust_xlsxwriter::Workbook as XlsxWorkbook;

use nomina_recon::model::{Record, Value};
use nomina_recon::normalize::normalize_records;

use crate::detect::find_header_row;
use crate::LoadError;

/// Import the first sheet of an Excel workbook as records, locating the
/// header row by the required-column set.
pub fn import(path: &Path, required: &[&str]) -> Result<Vec<Record>, LoadError> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| LoadError::Io(e.to_string()))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let first_sheet = sheet_names
        .first()
        .ok_or_else(|| LoadError::Sheet("workbook contains no sheets".into()))?;

    let range = workbook
        .worksheet_range(first_sheet)
        .map_err(|e| LoadError::Sheet(format!("cannot read sheet '{first_sheet}': {e}")))?;

    debug!(
        "sheet '{first_sheet}': {} rows x {} cols",
        range.get_size().0,
        range.get_size().1
    );

    // Display strings for header detection; typed values for the records.
    let grid: Vec<Vec<Data>> = range.rows().map(<[Data]>::to_vec).collect();
    let display: Vec<Vec<String>> = grid
        .iter()
        .map(|row| row.iter().map(cell_display).collect())
        .collect();

    let header_row = find_header_row(&display, required).ok_or_else(|| LoadError::HeaderNotFound {
        required: required.iter().map(|c| c.to_string()).collect(),
        window: nomina_recon::schema::MAX_HEADER_SEARCH_ROWS,
    })?;

    let headers = &display[header_row];
    let mut records = Vec::new();

    for row in &grid[header_row + 1..] {
        let mut record = Record::new();
        for (index, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            let value = row.get(index).map(cell_value).unwrap_or(Value::Empty);
            record.set(header.clone(), value);
        }
        if record.iter().all(|(_, value)| value.is_blank()) {
            continue;
        }
        records.push(record);
    }

    Ok(normalize_records(&records))
}

fn cell_display(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Value::Empty
            } else {
                Value::Text(trimmed.to_string())
            }
        }
        Data::Float(n) => Value::Number(*n),
        Data::Int(n) => Value::Number(*n as f64),
        Data::Bool(b) => Value::Text(b.to_string()),
        // Date cells keep their Excel serial number; the engine treats
        // period-range columns as opaque values either way.
        Data::DateTime(dt) => Value::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(e) => {
            debug!("cell error imported as blank: {e:?}");
            Value::Empty
        }
    }
}

/// Write a shaped table as one xlsx worksheet. Column widths follow the
/// header lengths with the layout's lower bound.
pub fn write_table(
    path: &Path,
    sheet_name: &str,
    headers: &[String],
    rows: &[Vec<Value>],
    min_column_width: usize,
) -> Result<(), LoadError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| LoadError::Sheet(format!("cannot create sheet '{sheet_name}': {e}")))?;

    for (col, header) in headers.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, header)
            .map_err(|e| LoadError::Sheet(e.to_string()))?;
        let width = header.chars().count().max(min_column_width);
        worksheet
            .set_column_width(col as u16, width as f64)
            .map_err(|e| LoadError::Sheet(e.to_string()))?;
    }

    for (row_index, row) in rows.iter().enumerate() {
        let row32 = (row_index + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            match value {
                Value::Text(s) => worksheet
                    .write_string(row32, col16, s)
                    .map_err(|e| LoadError::Sheet(e.to_string()))?,
                Value::Number(n) => worksheet
                    .write_number(row32, col16, *n)
                    .map_err(|e| LoadError::Sheet(e.to_string()))?,
                Value::Empty => continue,
            };
        }
    }

    workbook
        .save(path)
        .map_err(|e| LoadError::Io(format!("cannot save '{}': {e}", path.display())))?;
    Ok(())
}
