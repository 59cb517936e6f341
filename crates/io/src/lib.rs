//! `nomina-io` — file I/O for the reconciliation engine.
//!
//! Import: CSV (sniffed delimiter, Windows-1252 fallback) and Excel via
//! calamine, both with header-row auto-detection. Export: xlsx via
//! rust_xlsxwriter or CSV, chosen by extension.

use std::fmt;
use std::path::Path;

use nomina_recon::export::ExportFile;
use nomina_recon::model::Record;

pub mod csv;
pub mod detect;
pub mod xlsx;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum LoadError {
    /// No row containing all required columns within the search window.
    /// The dataset is unavailable; callers must not guess a header row.
    HeaderNotFound { required: Vec<String>, window: usize },
    /// File read / decode error.
    Io(String),
    /// Workbook structure error (no sheet, unreadable range, bad output).
    Sheet(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderNotFound { required, window } => write!(
                f,
                "header row not found within the first {window} rows (required columns: {})",
                required.join(", ")
            ),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Sheet(msg) => write!(f, "sheet error: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {}

// ---------------------------------------------------------------------------
// Import / export dispatch
// ---------------------------------------------------------------------------

/// Load one extract: first sheet (or the CSV body), header row detected by
/// the required-column set, rows normalized. Dispatches on extension.
pub fn load_records(path: &Path, required: &[&str]) -> Result<Vec<Record>, LoadError> {
    match extension(path).as_deref() {
        Some("csv") | Some("tsv") | Some("txt") => csv::import(path, required),
        _ => xlsx::import(path, required),
    }
}

/// Write one planned export file into `dir`; format follows the planned
/// file name's extension.
pub fn write_export(dir: &Path, export: &ExportFile) -> Result<(), LoadError> {
    let path = dir.join(&export.file_name);
    match extension(&path).as_deref() {
        Some("csv") | Some("tsv") => csv::write_table(&path, &export.headers, &export.rows),
        _ => xlsx::write_table(
            &path,
            &export.sheet_name,
            &export.headers,
            &export.rows,
            export.min_column_width,
        ),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomina_recon::model::Value;

    #[test]
    fn write_export_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let export = ExportFile {
            file_name: "salida.csv".into(),
            sheet_name: "Datos".into(),
            headers: vec!["RFC".into(), "LIQUIDO".into()],
            rows: vec![vec![Value::Text("AAA".into()), Value::Number(10.0)]],
            min_column_width: 15,
        };
        write_export(dir.path(), &export).unwrap();
        let content = std::fs::read_to_string(dir.path().join("salida.csv")).unwrap();
        assert!(content.starts_with("RFC,LIQUIDO"));
        assert!(content.contains("AAA,10"));
    }
}
