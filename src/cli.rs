use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::diff::DiffMode;
use crate::process::IngestLayout;
use crate::report::{PairingStrategy, ReportFormat, ReportOptions};
use crate::{Result, DB_PATH, DEFAULT_OFFSET_HOURS, HOST, PORT, SCRAPE_INTERVAL_MINS, SOURCE_URL};

/// Watches the richest Bitcoin addresses and reports how their transaction counts move.
#[derive(Parser)]
#[command(name = "richwatch", version, about)]
pub struct Cli {
    /// SQLite DB path
    #[arg(long, global = true, default_value = DB_PATH)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scrape on an interval and serve the status and report endpoints
    Serve {
        #[arg(long, default_value = HOST)]
        host: String,

        #[arg(long, default_value_t = PORT)]
        port: u16,

        /// Minutes between two scrapes
        #[arg(long, default_value_t = SCRAPE_INTERVAL_MINS)]
        interval_mins: u64,

        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Scrape once and store the snapshot
    Scrape {
        #[command(flatten)]
        ingest: IngestArgs,
    },

    /// Load a directory of bitcoin_rich_list_YYYYMMDD_HHMMSS.csv files
    Import {
        dir: PathBuf,

        /// Where ins/outs/wallet name come from: annotated or columns
        #[arg(long, default_value = "annotated")]
        layout: IngestLayout,
    },

    /// Print the change report
    Report {
        #[command(flatten)]
        report: ReportArgs,
    },
}

#[derive(Args)]
pub struct IngestArgs {
    /// Page listing the top addresses
    #[arg(long, default_value = SOURCE_URL)]
    pub url: String,

    /// Where ins/outs/wallet name come from: annotated or columns
    #[arg(long, default_value = "annotated")]
    pub layout: IngestLayout,

    /// Also write every capture as a CSV file into this directory
    #[arg(long)]
    pub csv_dir: Option<PathBuf>,

    /// Stamp captures with the exact second instead of the hour
    #[arg(long)]
    pub exact_time: bool,
}

#[derive(Args)]
pub struct ReportArgs {
    /// adjacent or fixed-offset
    #[arg(long, default_value = "adjacent")]
    pub pairing: String,

    /// Offset between paired snapshots for fixed-offset
    #[arg(long, default_value_t = DEFAULT_OFFSET_HOURS)]
    pub offset_hours: i64,

    /// positional or address
    #[arg(long, default_value = "positional")]
    pub mode: DiffMode,

    /// Render HTML instead of plain text
    #[arg(long)]
    pub html: bool,
}

impl ReportArgs {
    pub fn options(&self) -> Result<ReportOptions> {
        Ok(ReportOptions {
            pairing: PairingStrategy::from_name(&self.pairing, Some(self.offset_hours))?,
            diff_mode: self.mode,
            format: if self.html {
                ReportFormat::Html
            } else {
                ReportFormat::Text
            },
        })
    }
}
