use crate::model::{Record, Value};

/// Canonicalize raw parsed rows: keys are trimmed and uppercased, string
/// values trimmed, everything else passes through. Same cardinality in and
/// out; idempotent.
pub fn normalize_records(rows: &[Record]) -> Vec<Record> {
    rows.iter().map(normalize_record).collect()
}

fn normalize_record(row: &Record) -> Record {
    let mut out = Record::new();
    for (key, value) in row.iter() {
        let value = match value {
            Value::Text(s) => Value::Text(s.trim().to_string()),
            other => other.clone(),
        };
        out.set(normalize_key(key), value);
    }
    out
}

/// Canonical form of a field name or tax-id key: trimmed, uppercased.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Canonical form of a person name for identity comparison: diacritics
/// folded away, uppercased, trimmed. Comparison only, never for display.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().chars().map(fold_accent_upper).collect()
}

// Spanish-language extracts carry the Latin-1 accented vowels plus ñ; fold
// them onto their base letter so "JOSÉ" and "Jose" compare equal.
fn fold_accent_upper(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'Á' | 'À' | 'Â' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ñ' | 'Ñ' => 'N',
        'ç' | 'Ç' => 'C',
        _ => c.to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_trimmed_and_uppercased_values_trimmed() {
        let raw = vec![Record::from_pairs([
            ("  rfc ", Value::Text(" AAA010101 ".into())),
            ("Liquido", Value::Number(100.0)),
        ])];
        let normalized = normalize_records(&raw);
        assert_eq!(normalized[0].display("RFC"), "AAA010101");
        assert_eq!(normalized[0].get("LIQUIDO"), &Value::Number(100.0));
        assert!(!normalized[0].contains("rfc"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = vec![
            Record::from_pairs([(" Nombre ", " María López "), ("RFC", "aaa")]),
            Record::from_pairs([("banco", "BANAMEX")]),
        ];
        let once = normalize_records(&raw);
        let twice = normalize_records(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn rows_keep_their_own_key_sets() {
        let raw = vec![
            Record::from_pairs([("A", "1")]),
            Record::from_pairs([("B", "2")]),
        ];
        let normalized = normalize_records(&raw);
        assert_eq!(normalized.len(), 2);
        assert!(normalized[0].contains("A") && !normalized[0].contains("B"));
        assert!(normalized[1].contains("B"));
    }

    #[test]
    fn name_folding_strips_accents() {
        assert_eq!(normalize_name("  José Núñez  "), "JOSE NUNEZ");
        assert_eq!(normalize_name("MARÍA"), "MARIA");
        assert_eq!(normalize_name("maria"), "MARIA");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn accented_and_plain_names_compare_equal() {
        assert_eq!(normalize_name("Ángel Pérez"), normalize_name("ANGEL PEREZ"));
    }
}
