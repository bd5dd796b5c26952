use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;

use crate::extract::parse_count;
use crate::model::ScrapedRow;
use crate::{info_time, Error, Result, EXPECTED_NUM_OF_ENTRIES};

/// Attempts to parse the page, extracting the rows of every table that has an `id`.
/// Parsing happens on the blocking pool, `Html` is heavy and not `Send`.
pub(crate) async fn parse_rich_list(html: String) -> Result<Vec<ScrapedRow>> {
    let start_time = Local::now();
    let rows = spawn_blocking(move || parse_document(&html)).await??;
    info_time!(start_time, "Parsed {} rows", rows.len());
    Ok(rows)
}

/// Rows need at least rank, address and balance cells, and a numeric rank.
/// Header rows and spacer rows fall out on their own.
/// With six or more cells the 4th to 6th are kept as ins, outs and wallet.
pub(crate) fn parse_document(html: &str) -> Result<Vec<ScrapedRow>> {
    let doc = Html::parse_document(html);

    // Create selectors.
    let table_selector = create_selector("table[id]")?;
    let row_selector = create_selector("tr")?;
    let cell_selector = create_selector("td")?;

    let mut rows = Vec::with_capacity(EXPECTED_NUM_OF_ENTRIES);
    for table in doc.select(&table_selector) {
        for tr in table.select(&row_selector) {
            let cells: Vec<String> = tr.select(&cell_selector).map(cell_text).collect();
            if cells.len() < 3 {
                continue;
            }
            let Some(rank) = parse_count(&cells[0]) else {
                continue;
            };

            let extra = |idx: usize| (cells.len() >= 6).then(|| cells[idx].clone());
            rows.push(ScrapedRow {
                rank,
                address: cells[1].clone(),
                balance: cells[2].clone(),
                ins: extra(3),
                outs: extra(4),
                wallet: extra(5),
            });
        }
    }
    Ok(rows)
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

/// All text below `el`, whitespace runs collapsed to one space.
fn cell_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
