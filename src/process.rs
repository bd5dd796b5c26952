use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, Timelike};
use reqwest::Client;

use crate::archive::write_csv;
use crate::extract::{
    extract_btc_amount, extract_ins_outs, extract_usd_amount, extract_wallet_name, parse_count,
};
use crate::model::{ScrapedRow, SnapshotRow};
use crate::parse::parse_rich_list;
use crate::request::request_page_html;
use crate::store::SharedStore;
use crate::{info_time, warn_time, Error, Result};

/// Where `ins`, `outs` and the wallet name are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IngestLayout {
    /// Mined out of the annotation text of the address cell.
    #[default]
    Annotated,
    /// Taken from dedicated cells, falling back to the annotation when a cell is missing
    /// or unreadable.
    Columns,
}

impl FromStr for IngestLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "annotated" => Ok(IngestLayout::Annotated),
            "columns" => Ok(IngestLayout::Columns),
            other => Err(Error::InvalidOption {
                name: "layout",
                value: other.to_string(),
            }),
        }
    }
}

/// Everything one ingestion run needs.
#[derive(Clone)]
pub struct IngestContext {
    pub client: Client,
    pub url: String,
    pub store: SharedStore,
    pub layout: IngestLayout,
    /// When set, each capture is also written there as a CSV file.
    pub csv_dir: Option<PathBuf>,
    /// Captures are stamped on the hour, so a re-run inside the hour shares the instant.
    pub truncate_to_hour: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored { timestamp: NaiveDateTime, rows: usize },
    /// A snapshot with the same capture instant is already stored.
    Duplicate { timestamp: NaiveDateTime },
    Empty,
}

/// Derives the typed fields for every scraped row of one capture.
pub fn build_snapshot(
    timestamp: NaiveDateTime,
    scraped: &[ScrapedRow],
    layout: IngestLayout,
) -> Vec<SnapshotRow> {
    scraped
        .iter()
        .map(|raw| {
            let (annotated_ins, annotated_outs) = extract_ins_outs(&raw.address);
            let annotated_wallet = extract_wallet_name(&raw.address);

            let (ins, outs, wallet_name) = match layout {
                IngestLayout::Annotated => (annotated_ins, annotated_outs, annotated_wallet),
                IngestLayout::Columns => (
                    raw.ins.as_deref().and_then(parse_count).or(annotated_ins),
                    raw.outs.as_deref().and_then(parse_count).or(annotated_outs),
                    raw.wallet
                        .as_deref()
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .or(annotated_wallet),
                ),
            };

            SnapshotRow {
                timestamp,
                rank: raw.rank,
                address: raw.address.clone(),
                balance: raw.balance.clone(),
                btc_amount: extract_btc_amount(&raw.balance),
                usd_amount: extract_usd_amount(&raw.balance),
                ins,
                outs,
                wallet_name,
            }
        })
        .collect()
}

/// The capture instant for a scrape started at `now`.
pub fn snapshot_timestamp(now: NaiveDateTime, truncate_to_hour: bool) -> NaiveDateTime {
    let now = now.with_nanosecond(0).unwrap_or(now);
    if truncate_to_hour {
        now.with_minute(0).and_then(|t| t.with_second(0)).unwrap_or(now)
    } else {
        now
    }
}

/// Fetches the page once, stores it as one snapshot and archives it when asked to.
pub async fn ingest_once(ctx: &IngestContext) -> Result<IngestOutcome> {
    let start_time = Local::now();
    info_time!("Started scraping {}", ctx.url);

    let html = request_page_html(&ctx.client, &ctx.url).await?;
    let scraped = parse_rich_list(html).await?;
    if scraped.is_empty() {
        warn_time!("No data found on the page");
        return Ok(IngestOutcome::Empty);
    }

    let timestamp = snapshot_timestamp(Local::now().naive_local(), ctx.truncate_to_hour);
    let rows = build_snapshot(timestamp, &scraped, ctx.layout);

    // The lock only covers the write, never the network round trip.
    let written = ctx
        .store
        .run(move |store| {
            if store.has_snapshot(&timestamp)? {
                return Ok(None);
            }
            store.insert_snapshot(&rows).map(Some)
        })
        .await?;
    let Some(written) = written else {
        warn_time!("Snapshot {} already stored, skipping", timestamp);
        return Ok(IngestOutcome::Duplicate { timestamp });
    };
    info_time!(start_time, "Data saved to database at {}", timestamp);

    if let Some(dir) = &ctx.csv_dir {
        let path = write_csv(dir, &timestamp, &scraped)?;
        info_time!("Data saved to {}", path.display());
    }

    Ok(IngestOutcome::Stored {
        timestamp,
        rows: written,
    })
}
