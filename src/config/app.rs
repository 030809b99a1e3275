// src/config/app.rs
//! Process-wide configuration, built once at start-up from the environment
//! (after `.env` is loaded) and injected into the fetch client, store and scheduler.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::ingest::retry::{Backoff, RetryPolicy};
use crate::ingest::types::FetchOptions;
use crate::ingest::BatchConfig;

pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";
pub const DEFAULT_DATABASE_PATH: &str = "data/proposals.db";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub firecrawl_api_key: String,
    pub firecrawl_base_url: String,
    pub database_path: PathBuf,
    pub scrape_interval: Duration,
    pub scrape_on_start: bool,
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let firecrawl_api_key = get("FIRECRAWL_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("Missing FIRECRAWL_API_KEY env var"))?;

        let firecrawl_base_url = get("FIRECRAWL_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_FIRECRAWL_BASE_URL.to_string());

        let database_path = get("DATABASE_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let parse_u64 = |key: &str, default: u64| -> u64 {
            get(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        let parse_bool = |key: &str| -> bool {
            get(key).is_some_and(|v| {
                matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
            })
        };

        let wait_for = get("FETCH_WAIT_FOR_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis);

        let fetch = FetchOptions {
            timeout: Duration::from_secs(parse_u64("FETCH_TIMEOUT_SECS", 30).max(1)),
            wait_for,
            skip_tls_verification: parse_bool("FETCH_SKIP_TLS_VERIFY"),
            ..FetchOptions::default()
        };

        let retry = RetryPolicy::new(
            parse_u64("FETCH_MAX_ATTEMPTS", 3).clamp(1, 10) as u32,
            Backoff::Fixed(Duration::from_millis(parse_u64("FETCH_BACKOFF_MS", 2_000))),
        );

        let batch = BatchConfig {
            batch_size: parse_u64("SCRAPE_BATCH_SIZE", 3).max(1) as usize,
            inter_request_pause: Duration::from_millis(parse_u64("SCRAPE_REQUEST_PAUSE_MS", 2_000)),
            inter_batch_pause: Duration::from_millis(parse_u64("SCRAPE_BATCH_PAUSE_MS", 5_000)),
            fetch,
            retry,
        };

        Ok(Self {
            firecrawl_api_key,
            firecrawl_base_url,
            database_path,
            scrape_interval: Duration::from_secs(parse_u64("SCRAPE_INTERVAL_SECS", 86_400).max(60)),
            scrape_on_start: parse_bool("SCRAPE_ON_START"),
            batch,
        })
    }
}
