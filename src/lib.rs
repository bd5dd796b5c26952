//! Bitcoin rich list watcher.
//! Scrapes the top addresses page on an interval, appends every capture to SQLite and
//! reports how the `ins`/`outs` counts moved between captures.

pub mod archive;
pub mod cli;
pub mod diff;
mod error;
pub mod extract;
mod macros;
pub mod model;
mod parse;
pub mod process;
pub mod report;
mod request;
pub mod schedule;
pub mod server;
pub mod store;

pub use error::{Error, Result};

pub const SOURCE_URL: &str = "https://bitinfocharts.com/top-100-richest-bitcoin-addresses.html";
pub const DB_PATH: &str = "bitcoin_rich_list.db";
pub const CSV_PREFIX: &str = "bitcoin_rich_list_";
pub const HOST: &str = "0.0.0.0";
pub const PORT: u16 = 8001;
pub const SCRAPE_INTERVAL_MINS: u64 = 60;
/// Offset used by the `fixed-offset` pairing when none is given.
pub const DEFAULT_OFFSET_HOURS: i64 = 3;
/// The source page lists the top 100.
const EXPECTED_NUM_OF_ENTRIES: usize = 100;
