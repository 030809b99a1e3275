// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::pipeline::{Pipeline, RunError};

#[derive(Clone, Copy, Debug)]
pub struct ScrapeSchedulerCfg {
    pub interval: Duration,
    /// Fire immediately instead of waiting one full interval.
    pub run_on_start: bool,
}

/// Spawn the periodic scrape loop. A tick that finds a run already in progress
/// is skipped; run errors are logged and the loop keeps going.
pub fn spawn_scrape_scheduler(cfg: ScrapeSchedulerCfg, pipeline: Arc<Pipeline>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !cfg.run_on_start {
            // interval() completes its first tick immediately.
            ticker.tick().await;
        }
        loop {
            ticker.tick().await;
            match pipeline.try_run().await {
                Ok(summary) => tracing::info!(
                    target: "ingest",
                    found = summary.found,
                    inserted = summary.inserted,
                    "scheduled scrape tick"
                ),
                Err(RunError::AlreadyRunning) => {
                    tracing::info!(target: "ingest", "scheduled tick skipped, run in progress")
                }
                Err(e) => tracing::error!(target: "ingest", error = %e, "scheduled scrape failed"),
            }
        }
    })
}
