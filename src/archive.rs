//! CSV copies of captures, one file per capture, named after its capture instant.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::extract::{extract_timestamp_from_filename, parse_count};
use crate::model::ScrapedRow;
use crate::process::{build_snapshot, IngestLayout};
use crate::store::SqliteStore;
use crate::{info_time, warn_time, Result, CSV_PREFIX};

const CSV_HEADER: [&str; 3] = ["Rank", "Address", "Balance"];

/// `bitcoin_rich_list_YYYYMMDD_HHMMSS.csv`
pub fn csv_file_name(timestamp: &NaiveDateTime) -> String {
    format!("{CSV_PREFIX}{}.csv", timestamp.format("%Y%m%d_%H%M%S"))
}

pub fn write_csv(dir: &Path, timestamp: &NaiveDateTime, rows: &[ScrapedRow]) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(csv_file_name(timestamp));

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record([row.rank.to_string().as_str(), row.address.as_str(), row.balance.as_str()])?;
    }
    writer.flush()?;
    Ok(path)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files_imported: usize,
    pub rows_imported: usize,
    /// Matching files with no readable timestamp in the name, no rows, or already stored.
    pub files_skipped: usize,
}

/// Loads every `bitcoin_rich_list_*.csv` in `dir`, each file as one snapshot.
/// Files are visited in name order, which is capture order.
pub fn import_dir(store: &mut SqliteStore, dir: &Path, layout: IngestLayout) -> Result<ImportSummary> {
    let start_time = Local::now();
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(CSV_PREFIX) && name.ends_with(".csv"))
        .collect();
    names.sort_unstable();

    let mut summary = ImportSummary::default();
    for name in names {
        let Some(timestamp) = extract_timestamp_from_filename(&name) else {
            warn_time!("No timestamp in {}, skipping", name);
            summary.files_skipped += 1;
            continue;
        };
        if store.has_snapshot(&timestamp)? {
            warn_time!("Snapshot {} already stored, skipping {}", timestamp, name);
            summary.files_skipped += 1;
            continue;
        }

        let scraped = read_csv(&dir.join(&name))?;
        if scraped.is_empty() {
            warn_time!("No rows in {}, skipping", name);
            summary.files_skipped += 1;
            continue;
        }
        let rows = build_snapshot(timestamp, &scraped, layout);
        summary.rows_imported += store.insert_snapshot(&rows)?;
        summary.files_imported += 1;
        info_time!("Processed: {}", name);
    }

    info_time!(
        start_time,
        "Imported {} files ({} rows), skipped {}",
        summary.files_imported,
        summary.rows_imported,
        summary.files_skipped
    );
    Ok(summary)
}

/// Reads one archive file. The header row is skipped, rows without a numeric rank too.
fn read_csv(path: &Path) -> Result<Vec<ScrapedRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(rank), Some(address), Some(balance)) = (
            record.get(0).and_then(parse_count),
            record.get(1),
            record.get(2),
        ) else {
            continue;
        };
        rows.push(ScrapedRow {
            rank,
            address: address.to_string(),
            balance: balance.to_string(),
            ins: None,
            outs: None,
            wallet: None,
        });
    }
    Ok(rows)
}
