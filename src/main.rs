//! Grant scout service: binary entrypoint.
//! Boots the Axum HTTP server and the periodic scrape scheduler.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use grant_scout::api::{self, AppState};
use grant_scout::config::{load_sources_default, AppConfig};
use grant_scout::ingest::scheduler::{spawn_scrape_scheduler, ScrapeSchedulerCfg};
use grant_scout::metrics::Metrics;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    grant_scout::init_tracing();

    let cfg = AppConfig::from_env()?;
    let sources = load_sources_default().context("loading source list")?;
    tracing::info!(sources = sources.len(), interval_secs = cfg.scrape_interval.as_secs(), "config loaded");

    let metrics = match Metrics::install(sources.len()) {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = %e, "metrics disabled");
            None
        }
    };

    let pipeline = grant_scout::build_pipeline(&cfg, sources)?;
    spawn_scrape_scheduler(
        ScrapeSchedulerCfg {
            interval: cfg.scrape_interval,
            run_on_start: cfg.scrape_on_start,
        },
        pipeline.clone(),
    );

    let router = api::router(AppState::new(pipeline), metrics.as_ref());
    Ok(router.into())
}
