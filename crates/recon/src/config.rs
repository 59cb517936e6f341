use serde::Deserialize;

use crate::error::MergeError;
use crate::model::Record;
use crate::normalize::{normalize_key, normalize_name};
use crate::schema;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// How the join key between period and base rows is derived.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySpec {
    /// Column holding the identity in the period dataset.
    pub period_column: String,
    /// Column holding the identity in the base dataset.
    pub base_column: String,
    #[serde(default)]
    pub fold: KeyFold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFold {
    /// Tax-id style keys: trim + uppercase.
    #[default]
    Uppercase,
    /// Person-name keys: diacritics folded, then uppercase.
    FoldedName,
}

impl IdentitySpec {
    pub fn period_key(&self, row: &Record) -> String {
        self.apply(&row.display(&self.period_column))
    }

    pub fn base_key(&self, row: &Record) -> String {
        self.apply(&row.display(&self.base_column))
    }

    fn apply(&self, raw: &str) -> String {
        match self.fold {
            KeyFold::Uppercase => normalize_key(raw),
            KeyFold::FoldedName => normalize_name(raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Side channel (cash payments file)
// ---------------------------------------------------------------------------

/// Presence in the side file suppresses additions; rows whose reason column
/// contains the removal marker also inject removals.
#[derive(Debug, Clone, Deserialize)]
pub struct SideChannelPolicy {
    #[serde(default = "default_removal_marker")]
    pub removal_marker: String,
}

impl Default for SideChannelPolicy {
    fn default() -> Self {
        Self {
            removal_marker: default_removal_marker(),
        }
    }
}

fn default_removal_marker() -> String {
    "BAJA".to_string()
}

// ---------------------------------------------------------------------------
// Merged-row schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub source: ColumnSource,
}

/// Where a merged-output column takes its value from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case", tag = "from", content = "column")]
pub enum ColumnSource {
    /// 1-based output row number.
    Sequence,
    /// The folded join key of the row.
    Identity,
    Period(String),
    Base(String),
    /// Period value when non-blank, else the base row's value.
    PeriodThenBase(String),
    /// Base row's value whenever a base row matched, else the period value.
    BaseThenPeriod(String),
    /// Resolved pension modality.
    Modality,
}

// ---------------------------------------------------------------------------
// Modality resolution (pensions)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ModalityConfig {
    /// Key column of the optional side modality table (tax id).
    pub table_key_column: String,
    /// Value column of the side modality table.
    pub table_value_column: String,
    /// Period columns scanned for dictionary keywords, in order. The first
    /// column's raw value is kept when no keyword matches.
    pub keyword_columns: Vec<String>,
    pub default: String,
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SplitSpec {
    #[serde(default)]
    pub project: Option<ProjectSplit>,
    #[serde(default)]
    pub levels: Vec<LevelSpec>,
    pub bank_column: String,
}

/// Binary project classification: rows whose project column equals the
/// configured code go to `JARDIN`, everything else to `OTROS`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSplit {
    pub column: String,
    pub jardin_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelSpec {
    pub column: String,
    pub default_label: String,
}

// ---------------------------------------------------------------------------
// Output naming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputNames {
    #[serde(default = "default_merged_stem")]
    pub merged: String,
    #[serde(default = "default_additions_stem")]
    pub additions: String,
    #[serde(default = "default_removals_stem")]
    pub removals: String,
    #[serde(default = "default_cash_stem")]
    pub cash: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            merged: default_merged_stem(),
            additions: default_additions_stem(),
            removals: default_removals_stem(),
            cash: default_cash_stem(),
        }
    }
}

fn default_merged_stem() -> String {
    "Fusionado".to_string()
}
fn default_additions_stem() -> String {
    "Altas".to_string()
}
fn default_removals_stem() -> String {
    "Bajas".to_string()
}
fn default_cash_stem() -> String {
    "Efectivos".to_string()
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Full description of one reconciliation flow. The payroll and pension
/// flows are presets of this one structure; custom flows load from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    pub name: String,
    pub identity: IdentitySpec,
    #[serde(default)]
    pub side_channel: Option<SideChannelPolicy>,
    /// Also classify as addition a period row whose base record exists but
    /// carries a blank account.
    #[serde(default)]
    pub addition_when_account_blank: bool,
    pub default_removal_reason: String,
    #[serde(default = "default_reason_column")]
    pub reason_column: String,
    pub account_column: String,
    pub amount_column: String,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    /// Second name column consulted by bank layouts when the primary one is
    /// blank (pensions: BENEFICIARIO).
    #[serde(default)]
    pub payee_fallback_column: Option<String>,
    #[serde(default = "default_employee_column")]
    pub employee_column: String,
    pub merged_columns: Vec<ColumnSpec>,
    /// Column order of the merged roster file.
    pub export_columns: Vec<String>,
    pub additions_columns: Vec<String>,
    pub removals_columns: Vec<String>,
    /// Collect merged rows without an account as a separate cash roster.
    #[serde(default)]
    pub collect_cash_roster: bool,
    #[serde(default)]
    pub modality: Option<ModalityConfig>,
    pub split: SplitSpec,
    #[serde(default)]
    pub output: OutputNames,
}

fn default_reason_column() -> String {
    "MOTIVO".to_string()
}
fn default_name_column() -> String {
    "NOMBRE".to_string()
}
fn default_employee_column() -> String {
    "NE".to_string()
}

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.merged_columns.is_empty() {
            return Err(MergeError::ConfigValidation(
                "merged_columns must not be empty".into(),
            ));
        }
        if self.identity.period_column.trim().is_empty()
            || self.identity.base_column.trim().is_empty()
        {
            return Err(MergeError::ConfigValidation(
                "identity columns must not be blank".into(),
            ));
        }
        if self.split.bank_column.trim().is_empty() {
            return Err(MergeError::ConfigValidation(
                "split.bank_column must not be blank".into(),
            ));
        }
        let needs_modality = self
            .merged_columns
            .iter()
            .any(|c| matches!(c.source, ColumnSource::Modality));
        if needs_modality && self.modality.is_none() {
            return Err(MergeError::ConfigValidation(
                "a merged column uses the modality source but no [modality] table is configured"
                    .into(),
            ));
        }
        for (label, columns) in [
            ("export_columns", &self.export_columns),
            ("additions_columns", &self.additions_columns),
            ("removals_columns", &self.removals_columns),
        ] {
            if columns.is_empty() {
                return Err(MergeError::ConfigValidation(format!(
                    "{label} must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// The output column fed by the identity key, if the schema has one.
    pub fn identity_column(&self) -> Option<&str> {
        self.merged_columns
            .iter()
            .find(|c| matches!(c.source, ColumnSource::Identity))
            .map(|c| c.name.as_str())
    }

    // -----------------------------------------------------------------------
    // Presets
    // -----------------------------------------------------------------------

    /// Biweekly payroll flow: RFC-keyed, cash side file suppresses
    /// additions and injects "BAJA" removals.
    pub fn payroll() -> Self {
        use ColumnSource::*;
        MergeConfig {
            name: "Nóminas".into(),
            identity: IdentitySpec {
                period_column: "RFC".into(),
                base_column: "RFC".into(),
                fold: KeyFold::Uppercase,
            },
            side_channel: Some(SideChannelPolicy::default()),
            addition_when_account_blank: true,
            default_removal_reason: "No aparece en nómina nueva".into(),
            reason_column: default_reason_column(),
            account_column: "CUENTA".into(),
            amount_column: "LIQUIDO".into(),
            name_column: default_name_column(),
            payee_fallback_column: None,
            employee_column: default_employee_column(),
            merged_columns: vec![
                col("NUM", Sequence),
                col("NE", Base("NE".into())),
                col("NOMBRE", PeriodThenBase("NOMBRE".into())),
                col("RFC", Identity),
                col("CURP", Period("CURP".into())),
                col("CUENTA", Base("CUENTA".into())),
                col("BANCO", Base("BANCO".into())),
                col("TELEFONO", Base("TELEFONO".into())),
                col("CORREO ELECTRONICO", Base("CORREO ELECTRONICO".into())),
                col("SE ENVIA SOBRE A", Base("SE ENVIA SOBRE A".into())),
                col("OBSERVACIONES", Base("OBSERVACIONES".into())),
                col("TIPOPAGO", Period("TIPOPAGO".into())),
                col("CATEGORIA", Period("CATEGORIA".into())),
                col("PUESTO", Period("PUESTO".into())),
                col("PROYECTO", Period("PROYECTO".into())),
                col("NOMINA", Period("NOMINA".into())),
                col("DESDE", Period("DESDE".into())),
                col("HASTA", Period("HASTA".into())),
                col("LIQUIDO", Period("LIQUIDO".into())),
            ],
            export_columns: strs(schema::COL_MERGED),
            additions_columns: strs(schema::COL_NEW),
            removals_columns: strs(schema::COL_REMOVALS),
            collect_cash_roster: false,
            modality: None,
            split: SplitSpec {
                project: None,
                levels: vec![
                    LevelSpec {
                        column: "NOMINA".into(),
                        default_label: "SIN_NOMINA".into(),
                    },
                    LevelSpec {
                        column: "TIPOPAGO".into(),
                        default_label: "SIN_TIPOPAGO".into(),
                    },
                ],
                bank_column: "BANCO".into(),
            },
            output: OutputNames {
                merged: "Nomina_Fusionada".into(),
                additions: "Altas_Nomina".into(),
                removals: "Bajas_Nomina".into(),
                cash: "Nomina_Efectivos".into(),
            },
        }
    }

    /// Split the payroll flow by project classification as the outermost
    /// tier (Jardín vs Otros).
    pub fn payroll_by_project() -> Self {
        let mut config = Self::payroll();
        config.split.project = Some(ProjectSplit {
            column: "PROYECTO".into(),
            jardin_code: schema::JARDIN_PROJECT.into(),
        });
        config
    }

    /// Quincenal pension flow: keyed by beneficiary name (accent-folded),
    /// no side channel, modality-classified, cash roster collected.
    pub fn pensions() -> Self {
        use ColumnSource::*;
        MergeConfig {
            name: "Pensiones".into(),
            identity: IdentitySpec {
                period_column: "BENEFICIARIO".into(),
                base_column: "NOMBRE".into(),
                fold: KeyFold::FoldedName,
            },
            side_channel: None,
            addition_when_account_blank: false,
            default_removal_reason: "No aparece en nómina quincenal".into(),
            reason_column: default_reason_column(),
            account_column: "CUENTA".into(),
            amount_column: "IMPORTE".into(),
            name_column: default_name_column(),
            payee_fallback_column: Some("BENEFICIARIO".into()),
            employee_column: default_employee_column(),
            merged_columns: vec![
                col("NO.", Sequence),
                col("NOMBRE", BaseThenPeriod("NOMBRE".into())),
                col("RFC", Period("RFC".into())),
                col("BENEFICIARIO", Period("BENEFICIARIO".into())),
                col("CUENTA", Base("CUENTA".into())),
                col("NE", Base("NE".into())),
                col("BANCO", Base("BANCO".into())),
                col("PROYECTO", Period("PROYECTO".into())),
                col("FOLIO", Period("FOLIO".into())),
                col("IMPORTE", Period("IMPORTE".into())),
                col("CVE", Period("CVE".into())),
                col("NOMINA", Period("NOMINA".into())),
                col("TOTAL DE DESCUENTOS", Period("TOTAL DE DESCUENTOS".into())),
                col("MODALIDAD", Modality),
            ],
            export_columns: strs(schema::COL_MERGED_PENSIONES),
            additions_columns: strs(schema::COL_QUINCENAL),
            removals_columns: strs(schema::COL_REMOVALS_PENSIONES),
            collect_cash_roster: true,
            modality: Some(ModalityConfig {
                table_key_column: "RFC".into(),
                table_value_column: "MODALIDAD".into(),
                keyword_columns: vec!["MODALIDAD".into(), "NOMINA".into()],
                default: schema::MODALITY_DEFAULT.into(),
            }),
            split: SplitSpec {
                project: None,
                levels: vec![LevelSpec {
                    column: "MODALIDAD".into(),
                    default_label: "BASE".into(),
                }],
                bank_column: "BANCO".into(),
            },
            output: OutputNames {
                merged: "Pensiones_Fusionadas".into(),
                additions: "Altas_Pensiones".into(),
                removals: "Bajas_Pensiones".into(),
                cash: "Pensiones_Efectivos".into(),
            },
        }
    }
}

fn col(name: &str, source: ColumnSource) -> ColumnSpec {
    ColumnSpec {
        name: name.into(),
        source,
    }
}

fn strs(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        MergeConfig::payroll().validate().unwrap();
        MergeConfig::payroll_by_project().validate().unwrap();
        MergeConfig::pensions().validate().unwrap();
    }

    #[test]
    fn payroll_identity_keys_uppercase() {
        let config = MergeConfig::payroll();
        let row = Record::from_pairs([("RFC", "aaa010101xx1")]);
        assert_eq!(config.identity.period_key(&row), "AAA010101XX1");
    }

    #[test]
    fn pension_identity_keys_fold_accents() {
        let config = MergeConfig::pensions();
        let period = Record::from_pairs([("BENEFICIARIO", "José Pérez")]);
        let base = Record::from_pairs([("NOMBRE", "JOSE PEREZ")]);
        assert_eq!(
            config.identity.period_key(&period),
            config.identity.base_key(&base)
        );
    }

    #[test]
    fn identity_column_found_for_payroll_only() {
        assert_eq!(MergeConfig::payroll().identity_column(), Some("RFC"));
        assert_eq!(MergeConfig::pensions().identity_column(), None);
    }

    const CUSTOM: &str = r#"
name = "Honorarios"
default_removal_reason = "No aparece en el periodo"
account_column = "CUENTA"
amount_column = "IMPORTE"
export_columns = ["NUM", "RFC", "IMPORTE", "BANCO"]
additions_columns = ["RFC", "NOMBRE", "IMPORTE"]
removals_columns = ["RFC", "NOMBRE", "MOTIVO"]

[identity]
period_column = "RFC"
base_column = "RFC"
fold = "uppercase"

[side_channel]
removal_marker = "BAJA"

[[merged_columns]]
name = "NUM"
source = { from = "sequence" }

[[merged_columns]]
name = "RFC"
source = { from = "identity" }

[[merged_columns]]
name = "IMPORTE"
source = { from = "period", column = "IMPORTE" }

[[merged_columns]]
name = "BANCO"
source = { from = "base", column = "BANCO" }

[split]
bank_column = "BANCO"

[[split.levels]]
column = "NOMINA"
default_label = "SIN_NOMINA"
"#;

    #[test]
    fn parse_custom_toml_config() {
        let config = MergeConfig::from_toml(CUSTOM).unwrap();
        assert_eq!(config.name, "Honorarios");
        assert_eq!(config.merged_columns.len(), 4);
        assert_eq!(config.identity_column(), Some("RFC"));
        assert_eq!(config.reason_column, "MOTIVO");
        assert!(config.side_channel.is_some());
        assert_eq!(config.split.levels.len(), 1);
        assert!(config.split.project.is_none());
    }

    #[test]
    fn reject_modality_source_without_modality_table() {
        let input = CUSTOM.replace(
            "source = { from = \"identity\" }",
            "source = { from = \"modality\" }",
        );
        let err = MergeConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("modality"));
    }

    #[test]
    fn reject_empty_merged_columns() {
        let input = r#"
name = "Bad"
default_removal_reason = "x"
account_column = "CUENTA"
amount_column = "IMPORTE"
merged_columns = []
export_columns = ["A"]
additions_columns = ["A"]
removals_columns = ["A"]

[identity]
period_column = "RFC"
base_column = "RFC"

[split]
bank_column = "BANCO"
"#;
        let err = MergeConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("merged_columns"));
    }
}
