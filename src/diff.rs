use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use crate::model::{ChangeRecord, Comparison, SnapshotRow};
use crate::Error;

/// How rows of two snapshots are paired before comparing them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffMode {
    /// Index `i` of the earlier list against index `i` of the later one.
    #[default]
    Positional,
    /// Rows are matched by `address`, so reordering is reported as rank moves.
    Address,
}

impl DiffMode {
    pub fn compare(self, prev: &[SnapshotRow], curr: &[SnapshotRow]) -> Comparison {
        match self {
            DiffMode::Positional => Comparison {
                changes: compare(prev, curr),
                ..Comparison::default()
            },
            DiffMode::Address => compare_by_address(prev, curr),
        }
    }
}

impl FromStr for DiffMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positional" => Ok(DiffMode::Positional),
            "address" => Ok(DiffMode::Address),
            other => Err(Error::InvalidOption {
                name: "mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Positional comparison of two rank-ordered snapshots.
///
/// Emits a record for every index whose `ins` or `outs` differ. Trailing rows of the
/// longer list are ignored, so at most `min(prev.len(), curr.len())` records come back.
pub fn compare(prev: &[SnapshotRow], curr: &[SnapshotRow]) -> Vec<ChangeRecord> {
    prev.iter()
        .zip(curr)
        .filter(|(p, c)| p.ins != c.ins || p.outs != c.outs)
        .map(|(p, c)| ChangeRecord::from_pair(p, c))
        .collect()
}

/// Address-keyed comparison.
///
/// An address present in both snapshots yields a record when its `ins`, `outs` or
/// `rank` changed. The first occurrence of a duplicated address is the one used.
pub fn compare_by_address(prev: &[SnapshotRow], curr: &[SnapshotRow]) -> Comparison {
    let mut prev_by_address: HashMap<&str, &SnapshotRow> = HashMap::with_capacity(prev.len());
    for row in prev {
        prev_by_address.entry(row.address.as_str()).or_insert(row);
    }

    let mut seen = HashSet::with_capacity(curr.len());
    let mut comparison = Comparison::default();
    for row in curr {
        if !seen.insert(row.address.as_str()) {
            continue;
        }
        match prev_by_address.get(row.address.as_str()) {
            Some(p) if p.ins != row.ins || p.outs != row.outs || p.rank != row.rank => {
                comparison.changes.push(ChangeRecord::from_same_address(p, row));
            }
            Some(_) => {}
            None => comparison.entered.push(row.clone()),
        }
    }

    let mut exited_seen = HashSet::new();
    comparison.exited = prev
        .iter()
        .filter(|p| !seen.contains(p.address.as_str()) && exited_seen.insert(p.address.as_str()))
        .cloned()
        .collect();

    comparison
}
