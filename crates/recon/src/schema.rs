//! Column dictionaries for the known extract kinds.
//!
//! Column names stay in Spanish to match the source spreadsheets. Required
//! sets drive header-row detection; full sets drive the non-blocking
//! missing-column warning.

use crate::model::Record;

/// Header row must appear within this many leading rows of a sheet.
pub const MAX_HEADER_SEARCH_ROWS: usize = 20;

/// Project code whose rows classify as "Jardín" when splitting by project.
pub const JARDIN_PROJECT: &str = "1170141530100000200";

// ---------------------------------------------------------------------------
// Payroll (nóminas)
// ---------------------------------------------------------------------------

pub const COL_NEW: &[&str] = &[
    "TIPOPAGO", "NUE", "NUP", "RFC", "CURP", "NOMBRE", "CATEGORIA", "PUESTO",
    "PROYECTO", "NOMINA", "DESDE", "HASTA", "LIQUIDO",
];

pub const COL_BASE: &[&str] = &[
    "NUM", "NE", "NOMBRE", "RFC", "CUENTA", "BANCO", "TELEFONO",
    "CORREO ELECTRONICO", "SE ENVIA SOBRE A", "TIPOPAGO", "OBSERVACIONES",
];

pub const COL_CASH: &[&str] = &["RFC", "NOMBRE", "MODALIDAD", "MONTO", "MOTIVO"];

pub const COL_REMOVALS: &[&str] = &[
    "NUM", "NOMBRE", "RFC", "CUENTA", "BANCO", "TELEFONO",
    "CORREO ELECTRONICO", "SE ENVIA SOBRE A", "TIPOPAGO", "MOTIVO",
];

pub const COL_MERGED: &[&str] = &[
    "NUM", "NOMBRE", "RFC", "CURP", "CUENTA", "BANCO", "TELEFONO",
    "CORREO ELECTRONICO", "SE ENVIA SOBRE A", "TIPOPAGO", "CATEGORIA",
    "PUESTO", "PROYECTO", "NOMINA", "DESDE", "HASTA", "LIQUIDO",
];

pub const REQUIRED_NEW_COLS: &[&str] = &["RFC", "NOMBRE"];
pub const REQUIRED_BASE_COLS: &[&str] = &["NOMBRE", "RFC"];
pub const REQUIRED_CASH_COLS: &[&str] = &["RFC", "NOMBRE"];

// ---------------------------------------------------------------------------
// Pensions
// ---------------------------------------------------------------------------

pub const COL_QUINCENAL: &[&str] = &[
    "PROYECTO", "RFC", "NOMBRE", "BENEFICIARIO", "FOLIO", "IMPORTE", "CVE",
    "NOMINA", "TOTAL DE DESCUENTOS", "MODALIDAD",
];

pub const COL_BASE_PENSIONES: &[&str] = &["NO.", "NOMBRE", "CUENTA", "NE", "BANCO"];

pub const COL_REMOVALS_PENSIONES: &[&str] =
    &["NO.", "NOMBRE", "CUENTA", "NE", "BANCO", "MOTIVO"];

pub const COL_MERGED_PENSIONES: &[&str] = &[
    "NO.", "NOMBRE", "RFC", "BENEFICIARIO", "CUENTA", "NE", "BANCO",
    "PROYECTO", "FOLIO", "IMPORTE", "CVE", "NOMINA", "TOTAL DE DESCUENTOS",
    "MODALIDAD",
];

pub const REQUIRED_QUINCENAL_COLS: &[&str] = &["RFC", "NOMBRE"];
pub const REQUIRED_BASE_PENSIONES_COLS: &[&str] = &["NOMBRE"];

/// Keyword → canonical pension modality. Matching is a case-insensitive
/// contains test, most specific entries first.
pub const MODALITY_KEYWORDS: &[(&str, &str)] = &[
    ("CONTRATO CONFIANZA", "Contrato confianza"),
    ("MANDOS MEDIOS", "Mandos medios"),
    ("NOMBRAMIENTO CONFIANZA", "Nombramiento confianza"),
    ("BASE", "Base"),
];

pub const MODALITY_DEFAULT: &str = "Base";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Columns from `expected` that the (already normalized) dataset lacks.
/// Non-blocking: callers surface the list as a warning and continue with
/// blanks. An empty dataset validates trivially.
pub fn missing_columns(rows: &[Record], expected: &[&str]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    expected
        .iter()
        .filter(|col| !first.contains(col))
        .map(|col| col.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_columns_reports_gaps_in_order() {
        let rows = vec![Record::from_pairs([("RFC", "A"), ("NOMBRE", "B")])];
        let missing = missing_columns(&rows, &["RFC", "CUENTA", "NOMBRE", "BANCO"]);
        assert_eq!(missing, vec!["CUENTA".to_string(), "BANCO".to_string()]);
    }

    #[test]
    fn missing_columns_empty_dataset_is_clean() {
        assert!(missing_columns(&[], COL_BASE).is_empty());
    }

    #[test]
    fn modality_keywords_cover_the_four_categories() {
        assert_eq!(MODALITY_KEYWORDS.len(), 4);
        assert!(MODALITY_KEYWORDS.iter().any(|(_, v)| *v == MODALITY_DEFAULT));
    }
}
