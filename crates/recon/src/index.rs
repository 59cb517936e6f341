use std::collections::{HashMap, HashSet};

use log::debug;

use crate::config::{IdentitySpec, SideChannelPolicy};
use crate::model::Record;

// ---------------------------------------------------------------------------
// Base index
// ---------------------------------------------------------------------------

/// Insertion-ordered identity → record index over the base roster.
///
/// Roster files occasionally repeat a person; the freshest row (last in file
/// order) wins, but the entry keeps its original position so removal output
/// stays in file order. Rows with a blank identity are skipped.
#[derive(Debug, Default)]
pub struct KeyIndex {
    positions: HashMap<String, usize>,
    entries: Vec<(String, Record)>,
}

impl KeyIndex {
    pub fn build(rows: &[Record], identity: &IdentitySpec) -> Self {
        let mut index = KeyIndex::default();
        for row in rows {
            let key = identity.base_key(row);
            if key.is_empty() {
                continue;
            }
            match index.positions.get(&key) {
                Some(&pos) => index.entries[pos].1 = row.clone(),
                None => {
                    index.positions.insert(key.clone(), index.entries.len());
                    index.entries.push((key, row.clone()));
                }
            }
        }
        index
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.positions.get(key).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(key, row)| (key.as_str(), row))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All identity keys present in the period dataset.
pub fn period_identities(rows: &[Record], identity: &IdentitySpec) -> HashSet<String> {
    rows.iter()
        .map(|row| identity.period_key(row))
        .filter(|key| !key.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Side channel
// ---------------------------------------------------------------------------

/// Index over the optional cash/side file: identities paid through the
/// alternate channel, plus the subset flagged for removal.
#[derive(Debug, Default)]
pub struct SideChannel {
    identities: HashSet<String>,
    removal_positions: HashMap<String, usize>,
    removals: Vec<(String, Record)>,
}

impl SideChannel {
    pub fn build(rows: &[Record], identity: &IdentitySpec, policy: &SideChannelPolicy, reason_column: &str) -> Self {
        let marker = policy.removal_marker.to_uppercase();
        let mut side = SideChannel::default();
        for row in rows {
            // Side rows are keyed like period rows (same identity column).
            let key = identity.period_key(row);
            if key.is_empty() {
                continue;
            }
            side.identities.insert(key.clone());

            let reason = row.display(reason_column);
            if reason.to_uppercase().contains(&marker) {
                debug!(
                    "side-channel removal ({marker}): {} - {reason}",
                    row.display("NOMBRE")
                );
                match side.removal_positions.get(&key) {
                    Some(&pos) => side.removals[pos].1 = row.clone(),
                    None => {
                        side.removal_positions.insert(key.clone(), side.removals.len());
                        side.removals.push((key, row.clone()));
                    }
                }
            }
        }
        debug!(
            "side channel: {} identities excluded, {} flagged for removal",
            side.identities.len(),
            side.removals.len()
        );
        side
    }

    /// Is this identity paid through the side channel?
    pub fn excludes(&self, key: &str) -> bool {
        self.identities.contains(key)
    }

    pub fn removal_row(&self, key: &str) -> Option<&Record> {
        self.removal_positions.get(key).map(|&pos| &self.removals[pos].1)
    }

    /// Flagged rows in side-file order.
    pub fn removals(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.removals.iter().map(|(key, row)| (key.as_str(), row))
    }
}
