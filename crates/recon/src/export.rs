use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::MergeConfig;
use crate::model::{table_rows, Record, Value};
use crate::split::{BucketKey, SplitTree};

pub const BANAMEX: &str = "BANAMEX";
pub const BANORTE: &str = "BANORTE";

/// Fixed receiving-bank code carried on every Banorte wire row.
const BANORTE_RECEIVING_BANK: &str = "072";
/// Fixed account-type code carried on every Banorte wire row.
const BANORTE_ACCOUNT_TYPE: &str = "01";

// ---------------------------------------------------------------------------
// Account classification
// ---------------------------------------------------------------------------

/// Banamex account classification, derived from the digit count of the
/// account number: exactly 16 digits is a card, anything else (9, 12, ...)
/// a checking account. Separators are stripped before counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountKind {
    Tarjeta,
    Cheque,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tarjeta => write!(f, "Tarjeta"),
            Self::Cheque => write!(f, "Cheque"),
        }
    }
}

pub fn account_kind(account: &str) -> AccountKind {
    let digits = account.chars().filter(char::is_ascii_digit).count();
    if digits == 16 {
        AccountKind::Tarjeta
    } else {
        AccountKind::Cheque
    }
}

// ---------------------------------------------------------------------------
// Pay period
// ---------------------------------------------------------------------------

const MONTHS_ES: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

/// Biweekly pay period derived from a date: day 1–15 is the first half of
/// the month, the rest the second. Pure function of the injected date so
/// callers (and tests) pin it instead of reading the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayPeriod {
    pub quincena: &'static str,
    pub month: &'static str,
}

impl PayPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        PayPeriod {
            quincena: if date.day() <= 15 { "1a" } else { "2a" },
            month: MONTHS_ES[date.month0() as usize],
        }
    }

    /// Wire-transfer concept label, e.g. "1a Nomina de Ene".
    pub fn label(&self) -> String {
        format!("{} Nomina de {}", self.quincena, self.month)
    }
}

// ---------------------------------------------------------------------------
// Export plan
// ---------------------------------------------------------------------------

/// One file the writer collaborator should produce: rows already shaped,
/// headers in final order, filename composed.
#[derive(Debug, Clone, Serialize)]
pub struct ExportFile {
    pub file_name: String,
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Lower bound for column widths in spreadsheet output.
    pub min_column_width: usize,
}

/// Everything a bank layout needs besides the bucket rows.
pub struct ExportContext<'a> {
    pub period_label: String,
    pub account_column: &'a str,
    pub amount_column: &'a str,
    pub name_column: &'a str,
    pub payee_fallback_column: Option<&'a str>,
    pub employee_column: &'a str,
    pub export_columns: &'a [String],
}

impl<'a> ExportContext<'a> {
    pub fn from_config(config: &'a MergeConfig, date: NaiveDate) -> Self {
        ExportContext {
            period_label: PayPeriod::from_date(date).label(),
            account_column: &config.account_column,
            amount_column: &config.amount_column,
            name_column: &config.name_column,
            payee_fallback_column: config.payee_fallback_column.as_deref(),
            employee_column: &config.employee_column,
            export_columns: &config.export_columns,
        }
    }

    /// Payee name for wire rows: primary name column, falling back to the
    /// configured alternate (pensions: BENEFICIARIO).
    fn payee(&self, row: &Record) -> Value {
        let name = row.get(self.name_column);
        if !name.is_blank() {
            return name.clone();
        }
        self.payee_fallback_column
            .map(|column| row.get(column).clone())
            .unwrap_or(Value::Empty)
    }

    /// Amount for wire rows; blank cells pay zero.
    fn amount(&self, row: &Record) -> Value {
        let amount = row.get(self.amount_column);
        if amount.is_blank() {
            Value::Number(0.0)
        } else {
            amount.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Bank layouts
// ---------------------------------------------------------------------------

/// Row shape for one bank's disbursement file.
pub trait BankLayout {
    /// Filename prefix when the bank uses a dedicated wire format.
    fn file_prefix(&self) -> Option<&str> {
        None
    }

    fn min_column_width(&self) -> usize {
        20
    }

    fn headers(&self, ctx: &ExportContext) -> Vec<String>;

    fn rows(&self, bucket: &[Record], ctx: &ExportContext) -> Vec<Vec<Value>>;
}

/// Banamex wire layout: account type derived from the account number,
/// 1-based reference number per bucket, pay-period concept label.
pub struct BanamexLayout;

impl BankLayout for BanamexLayout {
    fn file_prefix(&self) -> Option<&str> {
        Some(BANAMEX)
    }

    fn headers(&self, _ctx: &ExportContext) -> Vec<String> {
        [
            "Tipo de Cuenta",
            "Cuenta",
            "Importe",
            "Nombre/Razón Social",
            "Ref. Num.",
            "Ref. AlfN.",
        ]
        .map(String::from)
        .to_vec()
    }

    fn rows(&self, bucket: &[Record], ctx: &ExportContext) -> Vec<Vec<Value>> {
        bucket
            .iter()
            .enumerate()
            .map(|(position, row)| {
                let account = row.display(ctx.account_column);
                vec![
                    Value::Text(account_kind(&account).to_string()),
                    row.get(ctx.account_column).clone(),
                    ctx.amount(row),
                    ctx.payee(row),
                    Value::Number((position + 1) as f64),
                    Value::Text(ctx.period_label.clone()),
                ]
            })
            .collect()
    }
}

/// Banorte wire layout: employee number plus the bank's fixed receiving
/// codes.
pub struct BanorteLayout;

impl BankLayout for BanorteLayout {
    fn file_prefix(&self) -> Option<&str> {
        Some(BANORTE)
    }

    fn headers(&self, _ctx: &ExportContext) -> Vec<String> {
        [
            "NO. EMPLEADO",
            "NOMBRE",
            "IMPORTE",
            "NO. BANCO RECEPTOR",
            "TIPO DE CUENTA",
            "CUENTA",
        ]
        .map(String::from)
        .to_vec()
    }

    fn rows(&self, bucket: &[Record], ctx: &ExportContext) -> Vec<Vec<Value>> {
        bucket
            .iter()
            .map(|row| {
                vec![
                    row.get(ctx.employee_column).clone(),
                    ctx.payee(row),
                    ctx.amount(row),
                    Value::Text(BANORTE_RECEIVING_BANK.into()),
                    Value::Text(BANORTE_ACCOUNT_TYPE.into()),
                    row.get(ctx.account_column).clone(),
                ]
            })
            .collect()
    }
}

/// Default layout: the full merged column set, unchanged.
pub struct GenericLayout;

impl BankLayout for GenericLayout {
    fn min_column_width(&self) -> usize {
        15
    }

    fn headers(&self, ctx: &ExportContext) -> Vec<String> {
        ctx.export_columns.to_vec()
    }

    fn rows(&self, bucket: &[Record], ctx: &ExportContext) -> Vec<Vec<Value>> {
        table_rows(bucket, ctx.export_columns)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Bank name → layout lookup. Banks without a registered layout get the
/// generic one; new wire formats register without touching the dispatch.
pub struct LayoutRegistry {
    layouts: HashMap<String, Box<dyn BankLayout>>,
    generic: GenericLayout,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        let mut registry = LayoutRegistry {
            layouts: HashMap::new(),
            generic: GenericLayout,
        };
        registry.register(BANAMEX, Box::new(BanamexLayout));
        registry.register(BANORTE, Box::new(BanorteLayout));
        registry
    }
}

impl LayoutRegistry {
    pub fn register(&mut self, bank: &str, layout: Box<dyn BankLayout>) {
        self.layouts.insert(bank.to_uppercase(), layout);
    }

    /// Layout for a bank, case-insensitive; falls back to the generic one.
    pub fn layout_for(&self, bank: &str) -> &dyn BankLayout {
        match self.layouts.get(&bank.to_uppercase()) {
            Some(layout) => layout.as_ref(),
            None => &self.generic,
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Compose a bucket filename: `{PREFIX_}{tiers joined by _}_{YYYYMMDD}.{ext}`.
/// Special layouts replace the trailing bank tier with their prefix.
fn bucket_file_name(
    layout: &dyn BankLayout,
    key: &BucketKey,
    date: NaiveDate,
    extension: &str,
) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(prefix) = layout.file_prefix() {
        parts.push(prefix);
    }
    if let Some(project) = &key.project {
        parts.push(project);
    }
    parts.extend(key.labels.iter().map(String::as_str));
    if layout.file_prefix().is_none() {
        parts.push(&key.bank);
    }
    format!("{}_{}.{extension}", parts.join("_"), date_stamp(date))
}

/// Shape one bucket into its export file.
pub fn plan_bucket(
    registry: &LayoutRegistry,
    config: &MergeConfig,
    key: &BucketKey,
    bucket: &[Record],
    date: NaiveDate,
    extension: &str,
) -> ExportFile {
    let ctx = ExportContext::from_config(config, date);
    let layout = registry.layout_for(&key.bank);
    ExportFile {
        file_name: bucket_file_name(layout, key, date, extension),
        sheet_name: "Datos".into(),
        headers: layout.headers(&ctx),
        rows: layout.rows(bucket, &ctx),
        min_column_width: layout.min_column_width(),
    }
}

/// Shape every bucket of a split tree, in tree order.
pub fn plan_all(
    registry: &LayoutRegistry,
    config: &MergeConfig,
    tree: &SplitTree,
    date: NaiveDate,
    extension: &str,
) -> Vec<ExportFile> {
    tree.iter()
        .map(|(key, bucket)| plan_bucket(registry, config, key, bucket, date, extension))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeConfig;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sixteen_digits_classify_as_card() {
        assert_eq!(account_kind("1234567890123456"), AccountKind::Tarjeta);
        assert_eq!(account_kind("1234-5678-9012-3456"), AccountKind::Tarjeta);
    }

    #[test]
    fn other_digit_counts_classify_as_cheque() {
        assert_eq!(account_kind("123456789"), AccountKind::Cheque);
        assert_eq!(account_kind("123456789012"), AccountKind::Cheque);
        assert_eq!(account_kind(""), AccountKind::Cheque);
        assert_eq!(account_kind("12345678901234567"), AccountKind::Cheque);
    }

    #[test]
    fn pay_period_splits_on_day_fifteen() {
        assert_eq!(PayPeriod::from_date(date(2025, 1, 15)).label(), "1a Nomina de Ene");
        assert_eq!(PayPeriod::from_date(date(2025, 1, 16)).label(), "2a Nomina de Ene");
        assert_eq!(PayPeriod::from_date(date(2025, 12, 1)).label(), "1a Nomina de Dic");
    }

    fn bucket_key(bank: &str) -> BucketKey {
        BucketKey {
            project: None,
            labels: vec!["QUINCENAL".into(), "NORMAL".into()],
            bank: bank.into(),
        }
    }

    fn merged_row(name: &str, cuenta: &str, liquido: f64, ne: &str) -> Record {
        Record::from_pairs([
            ("NOMBRE", Value::Text(name.into())),
            ("CUENTA", Value::Text(cuenta.into())),
            ("LIQUIDO", Value::Number(liquido)),
            ("NE", Value::Text(ne.into())),
        ])
    }

    #[test]
    fn banamex_plan_shapes_and_numbers_rows() {
        let registry = LayoutRegistry::default();
        let config = MergeConfig::payroll();
        let bucket = vec![
            merged_row("Ana", "1234567890123456", 100.0, "10"),
            merged_row("Beto", "123456789", 50.0, "11"),
        ];
        let file = plan_bucket(
            &registry,
            &config,
            &bucket_key("BANAMEX"),
            &bucket,
            date(2025, 3, 10),
            "xlsx",
        );
        assert_eq!(file.file_name, "BANAMEX_QUINCENAL_NORMAL_20250310.xlsx");
        assert_eq!(file.headers.len(), 6);
        assert_eq!(file.rows[0][0], Value::Text("Tarjeta".into()));
        assert_eq!(file.rows[1][0], Value::Text("Cheque".into()));
        assert_eq!(file.rows[0][4], Value::Number(1.0));
        assert_eq!(file.rows[1][4], Value::Number(2.0));
        assert_eq!(file.rows[0][5], Value::Text("1a Nomina de Mar".into()));
    }

    #[test]
    fn banamex_matches_case_insensitively() {
        let registry = LayoutRegistry::default();
        assert!(registry.layout_for("Banamex").file_prefix() == Some(BANAMEX));
    }

    #[test]
    fn banorte_plan_carries_fixed_codes() {
        let registry = LayoutRegistry::default();
        let config = MergeConfig::payroll();
        let bucket = vec![merged_row("Ana", "123456789", 75.5, "42")];
        let file = plan_bucket(
            &registry,
            &config,
            &bucket_key("BANORTE"),
            &bucket,
            date(2025, 3, 20),
            "xlsx",
        );
        assert_eq!(file.file_name, "BANORTE_QUINCENAL_NORMAL_20250320.xlsx");
        assert_eq!(file.rows[0][0], Value::Text("42".into()));
        assert_eq!(file.rows[0][3], Value::Text("072".into()));
        assert_eq!(file.rows[0][4], Value::Text("01".into()));
    }

    #[test]
    fn generic_plan_keeps_merged_columns_and_bank_in_name() {
        let registry = LayoutRegistry::default();
        let config = MergeConfig::payroll();
        let bucket = vec![merged_row("Ana", "123", 10.0, "1")];
        let file = plan_bucket(
            &registry,
            &config,
            &bucket_key("HSBC"),
            &bucket,
            date(2025, 3, 20),
            "xlsx",
        );
        assert_eq!(file.file_name, "QUINCENAL_NORMAL_HSBC_20250320.xlsx");
        assert_eq!(file.headers, config.export_columns);
        assert_eq!(file.min_column_width, 15);
    }

    #[test]
    fn project_tier_lands_in_file_name() {
        let registry = LayoutRegistry::default();
        let config = MergeConfig::payroll_by_project();
        let key = BucketKey {
            project: Some("JARDIN".into()),
            labels: vec!["QUINCENAL".into(), "NORMAL".into()],
            bank: "BANAMEX".into(),
        };
        let bucket = vec![merged_row("Ana", "123", 10.0, "1")];
        let file = plan_bucket(&registry, &config, &key, &bucket, date(2025, 7, 1), "xlsx");
        assert_eq!(file.file_name, "BANAMEX_JARDIN_QUINCENAL_NORMAL_20250701.xlsx");
    }

    #[test]
    fn pension_payee_falls_back_to_beneficiary() {
        let registry = LayoutRegistry::default();
        let config = MergeConfig::pensions();
        let row = Record::from_pairs([
            ("BENEFICIARIO", Value::Text("Carmen Díaz".into())),
            ("CUENTA", Value::Text("123456789".into())),
            ("IMPORTE", Value::Number(900.0)),
        ]);
        let key = BucketKey {
            project: None,
            labels: vec!["BASE".into()],
            bank: "BANAMEX".into(),
        };
        let file = plan_bucket(&registry, &config, &key, &[row], date(2025, 2, 2), "xlsx");
        assert_eq!(file.rows[0][3], Value::Text("Carmen Díaz".into()));
        assert_eq!(file.file_name, "BANAMEX_BASE_20250202.xlsx");
    }
}
