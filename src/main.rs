use chrono::Local;
use clap::Parser;
use richwatch::cli::{Cli, Command, IngestArgs};
use richwatch::process::{ingest_once, IngestContext, IngestOutcome};
use richwatch::report::{self, ReportFormat};
use richwatch::schedule::{scrape_interval, IngestTask};
use richwatch::server::{self, AppState};
use richwatch::store::{SharedStore, SqliteStore};
use richwatch::{archive, info_time, Result};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Local::now();
    let cli = Cli::parse();
    let store = SqliteStore::open(&cli.db)?;

    match cli.command {
        Command::Serve {
            host,
            port,
            interval_mins,
            ingest,
        } => {
            let store = SharedStore::new(store);
            let ctx = ingest_context(ingest, store.clone());

            let task = IngestTask::start(scrape_interval(interval_mins), move || {
                let ctx = ctx.clone();
                async move { ingest_once(&ctx).await.map(|_| ()) }
            });

            let shutdown = CancellationToken::new();
            tokio::spawn({
                let shutdown = shutdown.clone();
                async move {
                    let _ = tokio::signal::ctrl_c().await;
                    info_time!("Received Ctrl-C, shutting down");
                    shutdown.cancel();
                }
            });

            let served = server::serve(&host, port, AppState { store }, shutdown).await;
            task.stop().await?;
            served?;
        }
        Command::Scrape { ingest } => {
            let ctx = ingest_context(ingest, SharedStore::new(store));
            match ingest_once(&ctx).await? {
                IngestOutcome::Stored { timestamp, rows } => {
                    info_time!("Stored {} rows captured at {}", rows, timestamp)
                }
                IngestOutcome::Duplicate { timestamp } => {
                    info_time!("Snapshot {} was already stored", timestamp)
                }
                IngestOutcome::Empty => info_time!("Nothing stored"),
            }
        }
        Command::Import { dir, layout } => {
            SharedStore::new(store)
                .run(move |store| archive::import_dir(store, &dir, layout))
                .await?;
        }
        Command::Report { report: args } => {
            let options = args.options()?;
            let body = SharedStore::new(store)
                .run(move |store| report::render(&*store, &options))
                .await?;
            match options.format {
                ReportFormat::Html => print!("{}", report::html_page(&body)),
                ReportFormat::Text if body.is_empty() => println!("No changes between snapshots."),
                ReportFormat::Text => print!("{body}"),
            }
        }
    }

    info_time!(start_time, "Full program time:");
    Ok(())
}

fn ingest_context(args: IngestArgs, store: SharedStore) -> IngestContext {
    IngestContext {
        client: reqwest::Client::new(),
        url: args.url,
        store,
        layout: args.layout,
        csv_dir: args.csv_dir,
        truncate_to_hour: !args.exact_time,
    }
}
