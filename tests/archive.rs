use std::fs;

use chrono::NaiveDate;
use richwatch::archive::{import_dir, write_csv, ImportSummary};
use richwatch::model::ScrapedRow;
use richwatch::process::IngestLayout;
use richwatch::report::{render, ReportOptions};
use richwatch::store::{SnapshotSource, SqliteStore};

fn scraped(rank: i64, address: &str, balance: &str) -> ScrapedRow {
    ScrapedRow {
        rank,
        address: address.to_string(),
        balance: balance.to_string(),
        ins: None,
        outs: None,
        wallet: None,
    }
}

#[test]
fn written_archive_imports_back_into_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .unwrap();
    let rows = [
        scraped(1, "34xp4vRoCGJym3xR7yCVPFHoCNxv4Twseo wallet: Binance-coldwallet", "248,597 BTC ($16,312,762,839)"),
        scraped(2, "bc1qazcm763858nkj2dj986etajv6wquslv8uxwczt Ins:120, Outs:3", "94,643 BTC"),
    ];

    let path = write_csv(dir.path(), &ts, &rows).unwrap();
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("bitcoin_rich_list_20240115_093000.csv")
    );

    let mut store = SqliteStore::open_in_memory().unwrap();
    let summary = import_dir(&mut store, dir.path(), IngestLayout::Annotated).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            files_imported: 1,
            rows_imported: 2,
            files_skipped: 0,
        }
    );

    let stored = store.select_rows(&ts).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].wallet_name.as_deref(), Some("Binance-coldwallet"));
    assert_eq!(stored[0].btc_amount, Some(248_597.0));
    assert_eq!(stored[0].usd_amount, Some(16_312_762_839.0));
    assert_eq!((stored[1].ins, stored[1].outs), (Some(120), Some(3)));
    assert_eq!(stored[1].address, rows[1].address);
}

#[test]
fn import_skips_unrelated_untimed_and_known_files() {
    let dir = tempfile::tempdir().unwrap();
    let header = "Rank,Address,Balance\n";
    fs::write(
        dir.path().join("bitcoin_rich_list_20240115_090000.csv"),
        format!("{header}1,a Ins:1 Outs:1,10 BTC\n2,b Ins:2 Outs:2,5 BTC\n"),
    )
    .unwrap();
    fs::write(
        dir.path().join("bitcoin_rich_list_20240115_100000.csv"),
        format!("{header}1,a Ins:1 Outs:1,10 BTC\nx,garbage row,\n2,b Ins:3 Outs:2,5 BTC\n"),
    )
    .unwrap();
    fs::write(dir.path().join("bitcoin_rich_list_latest.csv"), header).unwrap();
    fs::write(dir.path().join("notes.csv"), header).unwrap();

    let mut store = SqliteStore::open_in_memory().unwrap();
    let first = import_dir(&mut store, dir.path(), IngestLayout::Annotated).unwrap();
    assert_eq!(first.files_imported, 2);
    assert_eq!(first.rows_imported, 4);
    assert_eq!(first.files_skipped, 1);

    // Second pass: both timed files are already stored.
    let second = import_dir(&mut store, dir.path(), IngestLayout::Annotated).unwrap();
    assert_eq!(second.files_imported, 0);
    assert_eq!(second.files_skipped, 3);
    assert_eq!(store.row_count().unwrap(), 4);

    let text = render(&store, &ReportOptions::default()).unwrap();
    assert!(text.contains("rank: 2\naddress: b Ins:3 Outs:2\nins: 2 -> 3\n"));
}
