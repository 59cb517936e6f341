use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

static EMPTY: Value = Value::Empty;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single cell value as handed over by the spreadsheet layer.
///
/// Sheets produce strings or numbers; anything missing is `Empty` and renders
/// as the empty string. Downstream code never distinguishes "column absent"
/// from "cell blank".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Empty,
}

impl Value {
    /// Parse a raw cell string the way a spreadsheet would: numeric-looking
    /// cells become numbers, everything else stays text. A string is only
    /// numeric if the number renders back to the same text, so account
    /// numbers with leading zeros keep their digits.
    pub fn parse(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Empty;
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() && format_number(n) == trimmed {
                return Value::Number(n);
            }
        }
        Value::Text(trimmed.to_string())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(_) => false,
            Value::Empty => true,
        }
    }

    /// Numeric view of the value; text parses as a financial number,
    /// blanks and non-numeric text count as zero.
    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => parse_financial_number(s).unwrap_or(0.0),
            Value::Empty => 0.0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Empty => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

/// Render a number the way spreadsheets display it: integral values without
/// a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Parse a financial number string:
/// - Strip `$`, commas, whitespace
/// - Handle `(123.45)` → `-123.45`
/// - Returns None if non-numeric characters remain after stripping
pub fn parse_financial_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (is_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (true, &trimmed[1..trimmed.len() - 1])
    } else {
        (false, trimmed)
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    for (i, c) in cleaned.chars().enumerate() {
        match c {
            '0'..='9' | '.' => {}
            '-' | '+' if i == 0 && !is_negative => {}
            _ => return None,
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if is_negative { -value } else { value })
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One row of a tabular extract: canonical field name → cell value.
///
/// Rows from the same file may carry differing key sets; reading a missing
/// field yields [`Value::Empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Record::new();
        for (key, value) in pairs {
            record.set(key.into(), value.into());
        }
        record
    }

    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&EMPTY)
    }

    /// Stringified view of a field, blank for missing cells.
    pub fn display(&self, field: &str) -> String {
        self.get(field).to_string()
    }

    pub fn number(&self, field: &str) -> f64 {
        self.get(field).as_number()
    }

    pub fn is_blank(&self, field: &str) -> bool {
        self.get(field).is_blank()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Project records onto an explicit column order, one cell vector per record.
/// Missing fields come out as [`Value::Empty`].
pub fn table_rows(records: &[Record], columns: &[String]) -> Vec<Vec<Value>> {
    records
        .iter()
        .map(|record| columns.iter().map(|col| record.get(col).clone()).collect())
        .collect()
}

/// Sum a numeric field over a record set. Non-numeric and blank cells
/// contribute zero.
pub fn total_amount(records: &[Record], field: &str) -> f64 {
    records.iter().map(|r| r.number(field)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_leading_zeros_as_text() {
        assert_eq!(Value::parse("0123456789"), Value::Text("0123456789".into()));
        assert_eq!(Value::parse("123456789"), Value::Number(123456789.0));
    }

    #[test]
    fn parse_blank_is_empty() {
        assert_eq!(Value::parse("   "), Value::Empty);
        assert_eq!(Value::parse(""), Value::Empty);
    }

    #[test]
    fn display_renders_integral_numbers_without_fraction() {
        assert_eq!(Value::Number(100.0).to_string(), "100");
        assert_eq!(Value::Number(100.5).to_string(), "100.5");
        assert_eq!(Value::Empty.to_string(), "");
    }

    #[test]
    fn as_number_parses_financial_text() {
        assert_eq!(Value::Text("$1,234.50".into()).as_number(), 1234.5);
        assert_eq!(Value::Text("(200)".into()).as_number(), -200.0);
        assert_eq!(Value::Text("n/a".into()).as_number(), 0.0);
        assert_eq!(Value::Empty.as_number(), 0.0);
    }

    #[test]
    fn record_missing_field_reads_blank() {
        let record = Record::from_pairs([("RFC", "AAA010101")]);
        assert_eq!(record.get("BANCO"), &Value::Empty);
        assert!(record.is_blank("BANCO"));
        assert_eq!(record.display("BANCO"), "");
    }

    #[test]
    fn total_amount_skips_non_numeric() {
        let rows = vec![
            Record::from_pairs([("LIQUIDO", Value::Number(100.0))]),
            Record::from_pairs([("LIQUIDO", Value::Text("50.5".into()))]),
            Record::from_pairs([("LIQUIDO", Value::Text("pendiente".into()))]),
            Record::new(),
        ];
        assert_eq!(total_amount(&rows, "LIQUIDO"), 150.5);
    }

    #[test]
    fn table_rows_follow_column_order() {
        let rows = vec![Record::from_pairs([("A", "1"), ("B", "2")])];
        let table = table_rows(&rows, &["B".to_string(), "C".to_string()]);
        assert_eq!(table[0][0], Value::Text("2".into()));
        assert_eq!(table[0][1], Value::Empty);
    }
}
