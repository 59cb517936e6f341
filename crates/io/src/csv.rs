// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use nomina_recon::model::{Record, Value};
use nomina_recon::normalize::normalize_records;

use crate::detect::find_header_row;
use crate::LoadError;

/// Import a delimited extract: decode, sniff the delimiter, locate the
/// header row, then build one record per data row.
pub fn import(path: &Path, required: &[&str]) -> Result<Vec<Record>, LoadError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter, required)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let mut file = std::fs::File::open(path).map_err(|e| LoadError::Io(e.to_string()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| LoadError::Io(e.to_string()))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(
    content: &str,
    delimiter: u8,
    required: &[&str],
) -> Result<Vec<Record>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoadError::Io(e.to_string()))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    let header_row = find_header_row(&rows, required).ok_or_else(|| LoadError::HeaderNotFound {
        required: required.iter().map(|c| c.to_string()).collect(),
        window: nomina_recon::schema::MAX_HEADER_SEARCH_ROWS,
    })?;

    let headers = &rows[header_row];
    let mut records = Vec::new();

    for row in &rows[header_row + 1..] {
        let mut record = Record::new();
        for (index, header) in headers.iter().enumerate() {
            if header.trim().is_empty() {
                continue;
            }
            let cell = row.get(index).map(String::as_str).unwrap_or("");
            record.set(header.clone(), Value::parse(cell));
        }
        if record.iter().all(|(_, value)| value.is_blank()) {
            continue;
        }
        records.push(record);
    }

    Ok(normalize_records(&records))
}

/// Write a shaped table as CSV, headers first.
pub fn write_table(path: &Path, headers: &[String], rows: &[Vec<Value>]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| LoadError::Io(e.to_string()))?;

    writer
        .write_record(headers)
        .map_err(|e| LoadError::Io(e.to_string()))?;
    for row in rows {
        let record: Vec<String> = row.iter().map(Value::to_string).collect();
        writer
            .write_record(&record)
            .map_err(|e| LoadError::Io(e.to_string()))?;
    }

    writer.flush().map_err(|e| LoadError::Io(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn import_detects_headers_and_parses_cells() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nomina.csv");
        fs::write(
            &path,
            "REPORTE QUINCENAL,,\n,,\nRFC,NOMBRE,LIQUIDO\naaa010101,Ana , 1500.5\nbbb020202,Beto,800\n",
        )
        .unwrap();

        let records = import(&path, &["RFC", "NOMBRE"]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].display("RFC"), "aaa010101");
        assert_eq!(records[0].display("NOMBRE"), "Ana");
        assert_eq!(records[0].get("LIQUIDO"), &Value::Number(1500.5));
    }

    #[test]
    fn import_fails_without_required_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("malo.csv");
        fs::write(&path, "FOLIO,IMPORTE\n1,100\n").unwrap();

        match import(&path, &["RFC", "NOMBRE"]) {
            Err(LoadError::HeaderNotFound { required, .. }) => {
                assert_eq!(required, vec!["RFC".to_string(), "NOMBRE".to_string()]);
            }
            other => panic!("expected HeaderNotFound, got {other:?}"),
        }
    }

    #[test]
    fn import_semicolon_delimited() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("puntoycoma.csv");
        fs::write(&path, "RFC;NOMBRE;LIQUIDO\naaa;Ana;100\nbbb;Beto;200\n").unwrap();

        let records = import(&path, &["RFC", "NOMBRE"]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].display("NOMBRE"), "Beto");
    }

    #[test]
    fn import_skips_fully_blank_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huecos.csv");
        fs::write(&path, "RFC,NOMBRE\naaa,Ana\n,\nbbb,Beto\n").unwrap();

        let records = import(&path, &["RFC", "NOMBRE"]).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn sniff_tab_and_pipe() {
        assert_eq!(sniff_delimiter("A\tB\tC\n1\t2\t3\n"), b'\t');
        assert_eq!(sniff_delimiter("A|B|C\n1|2|3\n"), b'|');
        assert_eq!(sniff_delimiter("A,B,C\n1,2,3\n"), b',');
    }

    #[test]
    fn write_table_round_trips_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table(
            &path,
            &["RFC".to_string(), "LIQUIDO".to_string()],
            &[vec![Value::Text("AAA".into()), Value::Number(100.5)]],
        )
        .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "RFC,LIQUIDO\nAAA,100.5\n");
    }
}
