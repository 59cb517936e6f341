use std::collections::BTreeMap;

use log::warn;
use serde::Serialize;

use crate::config::MergeConfig;
use crate::model::Record;
use crate::normalize::normalize_key;

/// Label for rows matching the configured project code.
pub const PROJECT_JARDIN: &str = "JARDIN";
/// Label for every other project.
pub const PROJECT_OTROS: &str = "OTROS";

// ---------------------------------------------------------------------------
// Bucket key
// ---------------------------------------------------------------------------

/// Coordinates of one disbursement bucket, outermost tier first: optional
/// project classification, one label per configured level, then the bank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub project: Option<String>,
    pub labels: Vec<String>,
    pub bank: String,
}

impl BucketKey {
    /// All tier labels in display order (project, levels, bank).
    pub fn tiers(&self) -> Vec<&str> {
        let mut tiers: Vec<&str> = Vec::new();
        if let Some(project) = &self.project {
            tiers.push(project);
        }
        tiers.extend(self.labels.iter().map(String::as_str));
        tiers.push(&self.bank);
        tiers
    }
}

// ---------------------------------------------------------------------------
// Split tree
// ---------------------------------------------------------------------------

/// Ordered partition of the merged roster into disbursement buckets.
///
/// Buckets exist only once a record lands in them, so no empty leaf is ever
/// observable. Rows with a blank bank cannot be routed and are dropped
/// (counted, logged, never an error). Rebuilt in full on every invocation.
#[derive(Debug, Default)]
pub struct SplitTree {
    buckets: BTreeMap<BucketKey, Vec<Record>>,
    pub skipped_no_bank: usize,
}

impl SplitTree {
    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, &[Record])> {
        self.buckets.iter().map(|(key, rows)| (key, rows.as_slice()))
    }

    pub fn get(&self, key: &BucketKey) -> Option<&[Record]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Partition merged records by (project?) → levels → bank. Relative order
/// within each bucket equals the input (merge output) order.
pub fn split(config: &MergeConfig, merged: &[Record]) -> SplitTree {
    let spec = &config.split;
    let mut tree = SplitTree::default();

    for row in merged {
        let bank = normalize_key(&row.display(&spec.bank_column));
        if bank.is_empty() {
            warn!(
                "split skipped (no bank): {}",
                row.display(&config.name_column)
            );
            tree.skipped_no_bank += 1;
            continue;
        }

        let project = spec.project.as_ref().map(|project| {
            if row.display(&project.column).trim() == project.jardin_code {
                PROJECT_JARDIN.to_string()
            } else {
                PROJECT_OTROS.to_string()
            }
        });

        let labels = spec
            .levels
            .iter()
            .map(|level| {
                let label = normalize_key(&row.display(&level.column));
                if label.is_empty() {
                    level.default_label.clone()
                } else {
                    label
                }
            })
            .collect();

        tree.buckets
            .entry(BucketKey {
                project,
                labels,
                bank,
            })
            .or_default()
            .push(row.clone());
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeConfig;
    use crate::model::Value;

    fn merged_row(nomina: &str, tipo: &str, banco: &str, num: i64) -> Record {
        Record::from_pairs([
            ("NOMINA", Value::Text(nomina.into())),
            ("TIPOPAGO", Value::Text(tipo.into())),
            ("BANCO", Value::Text(banco.into())),
            ("NUM", Value::Number(num as f64)),
        ])
    }

    #[test]
    fn blank_bank_rows_are_dropped() {
        let config = MergeConfig::payroll();
        let rows = vec![
            merged_row("QUINCENAL", "NORMAL", "BANAMEX", 1),
            merged_row("QUINCENAL", "NORMAL", "  ", 2),
        ];
        let tree = split(&config, &rows);
        assert_eq!(tree.bucket_count(), 1);
        assert_eq!(tree.skipped_no_bank, 1);
    }

    #[test]
    fn buckets_preserve_merge_order() {
        let config = MergeConfig::payroll();
        let rows = vec![
            merged_row("QUINCENAL", "NORMAL", "banamex", 1),
            merged_row("QUINCENAL", "NORMAL", "BANAMEX ", 2),
            merged_row("QUINCENAL", "RETROACTIVO", "BANAMEX", 3),
        ];
        let tree = split(&config, &rows);
        assert_eq!(tree.bucket_count(), 2);
        let key = BucketKey {
            project: None,
            labels: vec!["QUINCENAL".into(), "NORMAL".into()],
            bank: "BANAMEX".into(),
        };
        let bucket = tree.get(&key).unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].number("NUM"), 1.0);
        assert_eq!(bucket[1].number("NUM"), 2.0);
    }

    #[test]
    fn blank_levels_fall_back_to_default_labels() {
        let config = MergeConfig::payroll();
        let rows = vec![merged_row("", "", "HSBC", 1)];
        let tree = split(&config, &rows);
        let (key, _) = tree.iter().next().unwrap();
        assert_eq!(key.labels, vec!["SIN_NOMINA".to_string(), "SIN_TIPOPAGO".to_string()]);
        assert_eq!(key.bank, "HSBC");
    }

    #[test]
    fn project_tier_classifies_jardin_vs_otros() {
        let config = MergeConfig::payroll_by_project();
        let mut jardin = merged_row("Q", "N", "HSBC", 1);
        jardin.set("PROYECTO", crate::schema::JARDIN_PROJECT);
        let mut otros = merged_row("Q", "N", "HSBC", 2);
        otros.set("PROYECTO", "999");
        let tree = split(&config, &[jardin, otros]);
        let projects: Vec<Option<String>> =
            tree.iter().map(|(key, _)| key.project.clone()).collect();
        assert!(projects.contains(&Some(PROJECT_JARDIN.to_string())));
        assert!(projects.contains(&Some(PROJECT_OTROS.to_string())));
    }

    #[test]
    fn no_empty_leaf_buckets() {
        let config = MergeConfig::payroll();
        let tree = split(&config, &[]);
        assert!(tree.is_empty());
        for (_, rows) in tree.iter() {
            assert!(!rows.is_empty());
        }
    }

    #[test]
    fn tiers_flatten_in_display_order() {
        let key = BucketKey {
            project: Some("JARDIN".into()),
            labels: vec!["QUINCENAL".into(), "NORMAL".into()],
            bank: "BANORTE".into(),
        };
        assert_eq!(key.tiers(), vec!["JARDIN", "QUINCENAL", "NORMAL", "BANORTE"]);
    }
}
