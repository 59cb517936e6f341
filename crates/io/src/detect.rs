//! Header-row auto-detection.
//!
//! Real extracts carry title banners and blank rows above the column
//! headers; the header row is wherever every required column name shows up.

use log::debug;

use nomina_recon::schema::MAX_HEADER_SEARCH_ROWS;

/// Find the 0-indexed row where all required columns are present, searching
/// at most the first [`MAX_HEADER_SEARCH_ROWS`] rows. Matching is a
/// case-insensitive contains test per cell, so "RFC" also matches a header
/// cell like "RFC EMPLEADO".
pub fn find_header_row(rows: &[Vec<String>], required: &[&str]) -> Option<usize> {
    let window = rows.len().min(MAX_HEADER_SEARCH_ROWS + 1);

    for (index, row) in rows[..window].iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| cell.trim().to_uppercase())
            .filter(|cell| !cell.is_empty())
            .collect();

        let found_all = required.iter().all(|required_col| {
            let needle = required_col.to_uppercase();
            cells.iter().any(|cell| cell.contains(&needle))
        });

        if found_all {
            debug!("headers found at row {} (0-indexed: {index})", index + 1);
            return Some(index);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn finds_headers_below_a_title_banner() {
        let sheet = rows(&[
            &["NÓMINA QUINCENAL", "", ""],
            &["", "", ""],
            &["RFC", "NOMBRE", "LIQUIDO"],
            &["AAA", "Ana", "100"],
        ]);
        assert_eq!(find_header_row(&sheet, &["RFC", "NOMBRE"]), Some(2));
    }

    #[test]
    fn contains_match_tolerates_decorated_headers() {
        let sheet = rows(&[&["rfc empleado", "Nombre completo"]]);
        assert_eq!(find_header_row(&sheet, &["RFC", "NOMBRE"]), Some(0));
    }

    #[test]
    fn missing_required_column_means_no_header() {
        let sheet = rows(&[&["RFC", "LIQUIDO"], &["AAA", "100"]]);
        assert_eq!(find_header_row(&sheet, &["RFC", "NOMBRE"]), None);
    }

    #[test]
    fn search_stops_after_the_window() {
        let mut sheet = rows(&[]);
        for _ in 0..30 {
            sheet.push(vec!["relleno".to_string()]);
        }
        sheet.push(vec!["RFC".to_string(), "NOMBRE".to_string()]);
        assert_eq!(find_header_row(&sheet, &["RFC", "NOMBRE"]), None);
    }
}
