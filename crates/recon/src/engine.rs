use std::collections::{HashMap, HashSet};

use log::debug;
use serde::Serialize;

use crate::config::{ColumnSource, MergeConfig, ModalityConfig};
use crate::error::MergeError;
use crate::index::{period_identities, KeyIndex, SideChannel};
use crate::model::{total_amount, Record, Value};
use crate::normalize::normalize_key;
use crate::schema;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Pre-loaded, normalized datasets for one reconciliation run.
#[derive(Debug, Default)]
pub struct MergeInput {
    pub period: Vec<Record>,
    pub base: Vec<Record>,
    /// Optional cash/side file (payroll flow).
    pub side: Option<Vec<Record>>,
    /// Optional modality table (pension flow).
    pub modality: Option<Vec<Record>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub additions: usize,
    pub removals: usize,
    pub merged: usize,
    pub cash_roster: usize,
    /// Sum of the amount column over the merged output.
    pub total_amount: f64,
}

/// Result of one merge run. Recomputed in full on every invocation; never
/// incrementally updated.
#[derive(Debug)]
pub struct MergeOutput {
    /// Period rows not yet on the roster, one per identity, period order.
    pub additions: Vec<Record>,
    /// Base rows that left the roster, each annotated with a reason.
    pub removals: Vec<Record>,
    /// One row per period row, enriched with base-sourced fields.
    pub merged: Vec<Record>,
    /// Merged rows without an account (paid in cash), when collected.
    pub cash_roster: Vec<Record>,
    pub summary: MergeSummary,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Run one reconciliation per config. Both mandatory datasets must be
/// non-empty; the caller gates the action, the engine guards anyway.
pub fn run(config: &MergeConfig, input: &MergeInput) -> Result<MergeOutput, MergeError> {
    if input.period.is_empty() {
        return Err(MergeError::EmptyDataset { role: "period" });
    }
    if input.base.is_empty() {
        return Err(MergeError::EmptyDataset { role: "base" });
    }

    let base_index = KeyIndex::build(&input.base, &config.identity);
    let period_keys = period_identities(&input.period, &config.identity);

    let side = match (&config.side_channel, &input.side) {
        (Some(policy), Some(rows)) if !rows.is_empty() => Some(SideChannel::build(
            rows,
            &config.identity,
            policy,
            &config.reason_column,
        )),
        _ => None,
    };

    let modality = config
        .modality
        .as_ref()
        .map(|mc| ModalityResolver::build(mc, input.modality.as_deref()));

    let additions = collect_additions(config, input, &base_index, side.as_ref());
    let removals = collect_removals(config, &base_index, &period_keys, side.as_ref());
    let (merged, cash_roster) = build_merged(config, input, &base_index, modality.as_ref());

    let summary = MergeSummary {
        additions: additions.len(),
        removals: removals.len(),
        merged: merged.len(),
        cash_roster: cash_roster.len(),
        total_amount: total_amount(&merged, &config.amount_column),
    };

    Ok(MergeOutput {
        additions,
        removals,
        merged,
        cash_roster,
        summary,
    })
}

/// Additions: period rows whose identity is not yet serviceable from the
/// roster: absent from base, or present with a blank account when the
/// config says so. The side channel always suppresses an addition. At most
/// one addition per identity; first period occurrence wins.
fn collect_additions(
    config: &MergeConfig,
    input: &MergeInput,
    base_index: &KeyIndex,
    side: Option<&SideChannel>,
) -> Vec<Record> {
    let mut additions = Vec::new();
    let mut added: HashSet<String> = HashSet::new();

    for row in &input.period {
        let key = config.identity.period_key(row);
        if key.is_empty() || added.contains(&key) {
            continue;
        }
        if side.is_some_and(|s| s.excludes(&key)) {
            debug!(
                "excluded from additions (side channel): {}",
                row.display(&config.name_column)
            );
            continue;
        }

        let is_addition = match base_index.get(&key) {
            None => true,
            Some(base_row) => {
                config.addition_when_account_blank && base_row.is_blank(&config.account_column)
            }
        };

        if is_addition {
            debug!("addition: {}", row.display(&config.name_column));
            additions.push(row.clone());
            added.insert(key);
        }
    }

    additions
}

/// Removals: base entries absent from the period dataset, in base order,
/// followed by side-channel rows flagged for removal that the first pass
/// did not already emit. The side-channel reason overrides the default.
fn collect_removals(
    config: &MergeConfig,
    base_index: &KeyIndex,
    period_keys: &HashSet<String>,
    side: Option<&SideChannel>,
) -> Vec<Record> {
    let mut removals = Vec::new();
    let mut removed: HashSet<&str> = HashSet::new();

    for (key, base_row) in base_index.iter() {
        if period_keys.contains(key) {
            continue;
        }
        let reason = side
            .and_then(|s| s.removal_row(key))
            .map(|row| row.display(&config.reason_column))
            .unwrap_or_else(|| config.default_removal_reason.clone());
        let mut row = base_row.clone();
        row.set(config.reason_column.clone(), reason);
        removals.push(row);
        removed.insert(key);
    }

    if let Some(side) = side {
        for (key, side_row) in side.removals() {
            if removed.contains(key) {
                continue;
            }
            let reason = side_row.display(&config.reason_column);
            let row = match base_index.get(key) {
                Some(base_row) => {
                    let mut row = base_row.clone();
                    row.set(config.reason_column.clone(), reason);
                    row
                }
                None => synthesize_removal(config, key, side_row, &reason),
            };
            removals.push(row);
        }
    }

    removals
}

/// Minimal removal record for an identity known only to the side file:
/// name and identity carried over, reason set, everything else blank.
fn synthesize_removal(
    config: &MergeConfig,
    key: &str,
    side_row: &Record,
    reason: &str,
) -> Record {
    let identity_column = config.identity_column();
    let mut row = Record::new();
    for column in &config.removals_columns {
        let value = if column == &config.name_column {
            side_row.get(&config.name_column).clone()
        } else if identity_column == Some(column.as_str()) {
            Value::Text(key.to_string())
        } else if column == &config.reason_column {
            Value::Text(reason.to_string())
        } else {
            Value::Empty
        };
        row.set(column.clone(), value);
    }
    row
}

/// Merged output: one row per period row (multiplicity preserved), columns
/// sourced per schema, 1-based sequence in output order. Optionally collects
/// the no-account subset as the cash roster.
fn build_merged(
    config: &MergeConfig,
    input: &MergeInput,
    base_index: &KeyIndex,
    modality: Option<&ModalityResolver>,
) -> (Vec<Record>, Vec<Record>) {
    let mut merged = Vec::with_capacity(input.period.len());
    let mut cash_roster = Vec::new();

    for (position, period_row) in input.period.iter().enumerate() {
        let key = config.identity.period_key(period_row);
        let base_row = if key.is_empty() {
            None
        } else {
            base_index.get(&key)
        };

        let mut row = Record::new();
        for spec in &config.merged_columns {
            let value = match &spec.source {
                ColumnSource::Sequence => Value::Number((position + 1) as f64),
                ColumnSource::Identity => Value::Text(key.clone()),
                ColumnSource::Period(column) => period_row.get(column).clone(),
                ColumnSource::Base(column) => base_row
                    .map(|base| base.get(column).clone())
                    .unwrap_or(Value::Empty),
                ColumnSource::PeriodThenBase(column) => {
                    let period_value = period_row.get(column);
                    if period_value.is_blank() {
                        base_row
                            .map(|base| base.get(column).clone())
                            .unwrap_or(Value::Empty)
                    } else {
                        period_value.clone()
                    }
                }
                ColumnSource::BaseThenPeriod(column) => match base_row {
                    Some(base) => base.get(column).clone(),
                    None => period_row.get(column).clone(),
                },
                ColumnSource::Modality => match modality {
                    Some(resolver) => Value::Text(resolver.resolve(period_row)),
                    None => Value::Empty,
                },
            };
            row.set(spec.name.clone(), value);
        }

        if config.collect_cash_roster && row.is_blank(&config.account_column) {
            cash_roster.push(row.clone());
        }
        merged.push(row);
    }

    (merged, cash_roster)
}

// ---------------------------------------------------------------------------
// Modality resolution
// ---------------------------------------------------------------------------

/// Resolves a pension row's modality: side table by tax id first, then
/// keyword match over the configured columns, then the baseline category.
pub struct ModalityResolver<'a> {
    config: &'a ModalityConfig,
    table: HashMap<String, String>,
}

impl<'a> ModalityResolver<'a> {
    pub fn build(config: &'a ModalityConfig, table_rows: Option<&[Record]>) -> Self {
        let mut table = HashMap::new();
        for row in table_rows.unwrap_or(&[]) {
            let key = normalize_key(&row.display(&config.table_key_column));
            if key.is_empty() {
                continue;
            }
            table.insert(key, row.display(&config.table_value_column));
        }
        ModalityResolver { config, table }
    }

    pub fn resolve(&self, row: &Record) -> String {
        if let Some(raw) = self.table.get(&normalize_key(&row.display(&self.config.table_key_column))) {
            if !raw.trim().is_empty() {
                return keyword_category(raw).unwrap_or_else(|| raw.trim().to_string());
            }
        }

        for (position, column) in self.config.keyword_columns.iter().enumerate() {
            let raw = row.display(column);
            if raw.trim().is_empty() {
                continue;
            }
            if let Some(category) = keyword_category(&raw) {
                return category;
            }
            // The primary column's value stands on its own even when it
            // matches no known keyword.
            if position == 0 {
                return raw.trim().to_string();
            }
        }

        self.config.default.clone()
    }
}

fn keyword_category(raw: &str) -> Option<String> {
    let folded = raw.trim().to_uppercase();
    schema::MODALITY_KEYWORDS
        .iter()
        .find(|(keyword, _)| folded.contains(keyword))
        .map(|(_, category)| category.to_string())
}
