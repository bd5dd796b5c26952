//! Fixed-interval background job with an explicit start/stop lifecycle.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{info_time, warn_time, Result};

/// Longest accepted gap between two scrapes, one year.
pub const MAX_INTERVAL_MINS: u64 = 365 * 24 * 60;

/// Scrape period for a `--interval-mins` value, clamped to `1..=MAX_INTERVAL_MINS`.
pub fn scrape_interval(mins: u64) -> Duration {
    Duration::from_secs(mins.clamp(1, MAX_INTERVAL_MINS) * 60)
}

/// A running interval task. Dropping it leaves the task running, call [`IngestTask::stop`].
pub struct IngestTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl IngestTask {
    /// Spawns `job` every `every`. The first run happens right away.
    /// A failing run is logged and the next tick still fires.
    pub fn start<F, Fut>(every: Duration, job: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let handle = tokio::spawn({
            let token = token.clone();
            async move {
                let mut interval = tokio::time::interval(every);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                info_time!("Scheduled ingestion every {} sec", every.as_secs_f64());

                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => {}
                    }
                    // A run in progress is finished before the stop is honoured.
                    let start_time = Local::now();
                    if let Err(e) = job().await {
                        warn_time!("Scheduled ingestion failed: {}", e);
                    } else {
                        info_time!(start_time, "Scheduled ingestion done");
                    }
                }
                info_time!("Ingestion schedule stopped");
            }
        });
        IngestTask { token, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Cancels the schedule and waits for the task to wind down.
    pub async fn stop(self) -> Result<()> {
        self.token.cancel();
        self.handle.await?;
        Ok(())
    }
}
