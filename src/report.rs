//! Change report between successive snapshots.

use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::{Duration, NaiveDateTime};

use crate::diff::DiffMode;
use crate::model::{format_timestamp, ChangeRecord, Comparison, SnapshotRow};
use crate::store::SnapshotSource;
use crate::{Error, Result, DEFAULT_OFFSET_HOURS};

const ABSENT: &str = "none";
const SEPARATOR_WIDTH: usize = 50;

/// Which snapshots get compared with each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PairingStrategy {
    /// Each timestamp with the next one present in the store.
    #[default]
    Adjacent,
    /// Each timestamp with the snapshot exactly `offset` later, when there is one.
    FixedOffset(Duration),
}

impl PairingStrategy {
    /// Builds a strategy from its name, `adjacent` or `fixed-offset`.
    /// `offset_hours` only matters for `fixed-offset` and falls back to the default offset.
    pub fn from_name(name: &str, offset_hours: Option<i64>) -> Result<Self> {
        match name {
            "adjacent" => Ok(PairingStrategy::Adjacent),
            "fixed-offset" => {
                let hours = offset_hours.unwrap_or(DEFAULT_OFFSET_HOURS);
                let offset = Duration::try_hours(hours)
                    .filter(|offset| *offset > Duration::zero())
                    .ok_or_else(|| Error::InvalidOption {
                        name: "offset_hours",
                        value: hours.to_string(),
                    })?;
                Ok(PairingStrategy::FixedOffset(offset))
            }
            other => Err(Error::InvalidOption {
                name: "pairing",
                value: other.to_string(),
            }),
        }
    }

    /// `(earlier, later)` pairs over an ascending list of timestamps.
    pub fn pairs(&self, timestamps: &[NaiveDateTime]) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        match self {
            PairingStrategy::Adjacent => timestamps.windows(2).map(|w| (w[0], w[1])).collect(),
            PairingStrategy::FixedOffset(offset) => {
                let present: BTreeSet<NaiveDateTime> = timestamps.iter().copied().collect();
                timestamps
                    .iter()
                    .filter_map(|ts| {
                        let target = ts.checked_add_signed(*offset)?;
                        present.contains(&target).then_some((*ts, target))
                    })
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Html,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub pairing: PairingStrategy,
    pub diff_mode: DiffMode,
    pub format: ReportFormat,
}

/// A pair of snapshots that had something to report.
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
    pub comparison: Comparison,
}

/// Compares every pair picked by `options.pairing`.
///
/// Pairs where one side has no rows, or where the row counts differ (a capture
/// that is incomplete), are left out. Only store failures are errors.
pub fn collect_sections(
    store: &impl SnapshotSource,
    options: &ReportOptions,
) -> Result<Vec<ReportSection>> {
    let timestamps = store.select_distinct_timestamps()?;
    let mut sections = Vec::new();

    for (from, to) in options.pairing.pairs(&timestamps) {
        let prev = store.select_rows(&from)?;
        let curr = store.select_rows(&to)?;
        if prev.is_empty() || curr.is_empty() || prev.len() != curr.len() {
            continue;
        }

        let comparison = options.diff_mode.compare(&prev, &curr);
        if !comparison.is_empty() {
            sections.push(ReportSection { from, to, comparison });
        }
    }
    Ok(sections)
}

/// Renders the whole report as one blob. An empty string means nothing changed.
pub fn render(store: &impl SnapshotSource, options: &ReportOptions) -> Result<String> {
    let sections = collect_sections(store, options)?;
    let mut out = String::new();
    for section in &sections {
        match options.format {
            ReportFormat::Text => write_text_section(&mut out, section),
            ReportFormat::Html => write_html_section(&mut out, section),
        }
    }
    Ok(out)
}

/// Wraps a rendered HTML report in a standalone page.
pub fn html_page(body: &str) -> String {
    format!(
        "<html>\n<head>\n<title>Bitcoin Rich List Changes Report</title>\n</head>\n<body>\n\
         <h1>Bitcoin Rich List Changes Report</h1>\n{body}</body>\n</html>\n"
    )
}

fn write_text_section(out: &mut String, section: &ReportSection) {
    // Writing into a String can't fail.
    let _ = writeln!(
        out,
        "Changes between {} and {}:",
        format_timestamp(&section.from),
        format_timestamp(&section.to)
    );
    for change in &section.comparison.changes {
        for line in change_lines(change) {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out, "{}", "-".repeat(SEPARATOR_WIDTH));
    }
    for row in &section.comparison.entered {
        let _ = writeln!(out, "{}", entered_line(row));
    }
    for row in &section.comparison.exited {
        let _ = writeln!(out, "{}", exited_line(row));
    }
    out.push('\n');
}

fn write_html_section(out: &mut String, section: &ReportSection) {
    let _ = writeln!(
        out,
        "<h2>Changes between {} and {}:</h2>",
        format_timestamp(&section.from),
        format_timestamp(&section.to)
    );
    for change in &section.comparison.changes {
        let lines: Vec<String> = change_lines(change).iter().map(|l| escape_html(l)).collect();
        let _ = writeln!(out, "<p>{}</p>\n<hr>", lines.join("<br>"));
    }
    for row in &section.comparison.entered {
        let _ = writeln!(out, "<p>{}</p>", escape_html(&entered_line(row)));
    }
    for row in &section.comparison.exited {
        let _ = writeln!(out, "<p>{}</p>", escape_html(&exited_line(row)));
    }
}

fn change_lines(change: &ChangeRecord) -> Vec<String> {
    let mut lines = vec![format!("rank: {}", change.rank), format!("address: {}", change.address)];
    if let Some(prev_rank) = change.prev_rank.filter(|prev| *prev != change.rank) {
        lines.push(format!("moved from rank {prev_rank}"));
    }
    if change.ins_changed() {
        lines.push(format!(
            "ins: {} -> {}",
            count_or_absent(change.prev_ins),
            count_or_absent(change.curr_ins)
        ));
    }
    if change.outs_changed() {
        lines.push(format!(
            "outs: {} -> {}",
            count_or_absent(change.prev_outs),
            count_or_absent(change.curr_outs)
        ));
    }
    lines.push(format!(
        "wallet name: {}",
        change.wallet_name.as_deref().unwrap_or(ABSENT)
    ));
    lines
}

fn entered_line(row: &SnapshotRow) -> String {
    format!("entered at rank {}: {}", row.rank, row.address)
}

fn exited_line(row: &SnapshotRow) -> String {
    format!("left from rank {}: {}", row.rank, row.address)
}

fn count_or_absent(count: Option<i64>) -> String {
    count.map_or_else(|| ABSENT.to_string(), |c| c.to_string())
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
