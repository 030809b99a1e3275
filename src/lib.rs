// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod agency;
pub mod api;
pub mod config;
pub mod dates;
pub mod extract;
pub mod filters;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod proposal;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::notify::{NewProposalsEvent, NotifierMux};
pub use crate::pipeline::{Pipeline, RunError, RunSummary};
pub use crate::proposal::{DateValue, ProposalRecord, RecordKey, StoredProposal};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{AppConfig, Source};
use crate::ingest::providers::FirecrawlClient;
use crate::store::SqliteStore;

/// Install the global subscriber. `RUST_LOG` picks levels (default: info for this
/// crate's log targets, warn elsewhere); `LOG_FORMAT=json` switches to JSON lines.
/// A second call, or a host runtime that already installed one, is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("grant_scout=info,ingest=info,store=info,notify=info,api=info,warn"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Wire the production pipeline: Firecrawl fetcher, SQLite store, env-configured notifiers.
pub fn build_pipeline(cfg: &AppConfig, sources: Vec<Source>) -> Result<Arc<Pipeline>> {
    let fetcher = FirecrawlClient::new(cfg.firecrawl_api_key.clone(), cfg.firecrawl_base_url.clone())?;
    let store = SqliteStore::open(&cfg.database_path)
        .with_context(|| format!("opening store at {}", cfg.database_path.display()))?;
    tracing::info!(target: "store", path = %cfg.database_path.display(), "store opened");

    let pipeline = Pipeline::new(Arc::new(fetcher), Arc::new(store), sources, cfg.batch.clone())
        .with_notifier(Arc::new(NotifierMux::from_env()));
    Ok(Arc::new(pipeline))
}
