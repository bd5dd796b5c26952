use chrono::NaiveDateTime;

use crate::{Error, Result};

/// Layout used to store and display snapshot timestamps.
/// Fixed width, so lexical order matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|_| Error::InvalidTimestamp(raw.to_string()))
}

/// One ranked entry of the rich list at one capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub timestamp: NaiveDateTime,
    pub rank: i64,
    pub address: String,
    pub balance: String,
    pub btc_amount: Option<f64>,
    pub usd_amount: Option<f64>,
    pub ins: Option<i64>,
    pub outs: Option<i64>,
    pub wallet_name: Option<String>,
}

/// The raw cells of one scraped table row, before any field is extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedRow {
    pub rank: i64,
    pub address: String,
    pub balance: String,
    pub ins: Option<String>,
    pub outs: Option<String>,
    pub wallet: Option<String>,
}

/// A tracked field changed for one entry between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub rank: i64,
    /// Rank the same address held before. Only known when rows are matched by address.
    pub prev_rank: Option<i64>,
    pub address: String,
    pub wallet_name: Option<String>,
    pub prev_ins: Option<i64>,
    pub curr_ins: Option<i64>,
    pub prev_outs: Option<i64>,
    pub curr_outs: Option<i64>,
}

impl ChangeRecord {
    /// Rows paired by position. Nothing ties them to one address, so no rank move is known.
    pub(crate) fn from_pair(prev: &SnapshotRow, curr: &SnapshotRow) -> Self {
        ChangeRecord {
            rank: curr.rank,
            prev_rank: None,
            address: curr.address.clone(),
            wallet_name: curr.wallet_name.clone(),
            prev_ins: prev.ins,
            curr_ins: curr.ins,
            prev_outs: prev.outs,
            curr_outs: curr.outs,
        }
    }

    pub(crate) fn from_same_address(prev: &SnapshotRow, curr: &SnapshotRow) -> Self {
        ChangeRecord {
            prev_rank: Some(prev.rank),
            ..Self::from_pair(prev, curr)
        }
    }

    pub fn ins_changed(&self) -> bool {
        self.prev_ins != self.curr_ins
    }

    pub fn outs_changed(&self) -> bool {
        self.prev_outs != self.curr_outs
    }

    pub fn rank_changed(&self) -> bool {
        self.prev_rank.is_some_and(|prev| prev != self.rank)
    }
}

/// Everything the differ found between two snapshots.
/// `entered` and `exited` are only filled when rows are keyed by address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub changes: Vec<ChangeRecord>,
    pub entered: Vec<SnapshotRow>,
    pub exited: Vec<SnapshotRow>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.entered.is_empty() && self.exited.is_empty()
    }
}
