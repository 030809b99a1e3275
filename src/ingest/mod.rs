// src/ingest/mod.rs
pub mod providers;
pub mod retry;
pub mod scheduler;
pub mod types;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::time::Duration;

use crate::config::sources::Source;
use crate::extract::ExtractionEngine;
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::{ContentFetcher, FetchError, FetchOptions};
use crate::proposal::{dedup_first_wins, sort_by_deadline, ProposalRecord, RecordKey};

/// Extra local bound on top of the per-request timeout, so no fetcher can hang a run.
const FETCH_HARD_GRACE: Duration = Duration::from_secs(10);

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scrape_runs_total", "Scrape runs started.");
        describe_counter!("scrape_sources_total", "Source pages attempted.");
        describe_counter!(
            "scrape_source_errors_total",
            "Source pages skipped after fetch errors."
        );
        describe_counter!(
            "scrape_records_found_total",
            "Records found after in-run deduplication."
        );
        describe_counter!(
            "scrape_records_new_total",
            "Records not yet present in the store."
        );
        describe_histogram!("extract_page_ms", "Extraction time per page in milliseconds.");
        describe_histogram!("fetch_ms", "Fetch service round trip in milliseconds.");
        describe_gauge!("scrape_last_run_ts", "Unix ts when the last scrape run finished.");
    });
}

/// Pacing and fetch settings for one sweep over the source list.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub inter_request_pause: Duration,
    pub inter_batch_pause: Duration,
    pub fetch: FetchOptions,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            inter_request_pause: Duration::from_secs(2),
            inter_batch_pause: Duration::from_secs(5),
            fetch: FetchOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl BatchConfig {
    /// No pauses and a single attempt; handy for tests and one-off runs against fixtures.
    pub fn immediate() -> Self {
        Self {
            inter_request_pause: Duration::ZERO,
            inter_batch_pause: Duration::ZERO,
            retry: RetryPolicy::none(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Deduplicated and sorted by deadline.
    pub records: Vec<ProposalRecord>,
    pub sources_total: usize,
    pub failed_sources: Vec<String>,
    /// Fetched fine but carried no usable content.
    pub empty_sources: Vec<String>,
    pub duplicates_dropped: usize,
}

/// Fetch and extract every source in sequential batches.
///
/// A credentials rejection aborts the whole sweep and is the only error returned;
/// any other per-source failure is logged and the source is skipped.
pub async fn run_batch(
    fetcher: &dyn ContentFetcher,
    sources: &[Source],
    cfg: &BatchConfig,
    engine: &ExtractionEngine,
) -> Result<BatchOutcome, FetchError> {
    ensure_metrics_described();

    let mut outcome = BatchOutcome {
        sources_total: sources.len(),
        ..BatchOutcome::default()
    };
    let mut collected = Vec::new();
    let bound = cfg.fetch.timeout + FETCH_HARD_GRACE;

    for (batch_idx, batch) in sources.chunks(cfg.batch_size.max(1)).enumerate() {
        if batch_idx > 0 && !cfg.inter_batch_pause.is_zero() {
            tokio::time::sleep(cfg.inter_batch_pause).await;
        }

        for (i, source) in batch.iter().enumerate() {
            if i > 0 && !cfg.inter_request_pause.is_zero() {
                tokio::time::sleep(cfg.inter_request_pause).await;
            }
            counter!("scrape_sources_total").increment(1);

            let url = source.url.as_str();
            let opts = &cfg.fetch;
            let fetched = cfg
                .retry
                .run(
                    url,
                    move |_| async move {
                        match tokio::time::timeout(bound, fetcher.fetch(url, opts)).await {
                            Ok(r) => r,
                            Err(_) => Err(FetchError::Timeout(bound)),
                        }
                    },
                    FetchError::is_retryable,
                )
                .await;

            let page = match fetched {
                Ok(p) => p,
                Err(e) if e.is_auth() => {
                    tracing::error!(target: "ingest", source = url, error = %e, "fetch service refused credentials, aborting run");
                    counter!("scrape_source_errors_total").increment(1);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", source = url, fetcher = fetcher.name(), error = %e, "source skipped");
                    counter!("scrape_source_errors_total").increment(1);
                    outcome.failed_sources.push(source.url.clone());
                    continue;
                }
            };

            let Some(text) = page.text() else {
                tracing::info!(target: "ingest", source = url, "no usable content, skipped");
                outcome.empty_sources.push(source.url.clone());
                continue;
            };

            let records = engine.extract(text, source, Utc::now());
            tracing::info!(target: "ingest", source = url, found = records.len(), "source extracted");
            collected.extend(records);
        }
    }

    let (mut records, dropped) = dedup_first_wins(collected);
    sort_by_deadline(&mut records);
    counter!("scrape_records_found_total").increment(records.len() as u64);

    outcome.records = records;
    outcome.duplicates_dropped = dropped;
    Ok(outcome)
}

/// Records whose key is not yet in `existing`, in input order.
pub fn compute_delta(
    records: &[ProposalRecord],
    existing: &HashSet<RecordKey>,
) -> Vec<ProposalRecord> {
    let delta: Vec<ProposalRecord> = records
        .iter()
        .filter(|r| !existing.contains(&r.key()))
        .cloned()
        .collect();
    counter!("scrape_records_new_total").increment(delta.len() as u64);
    delta
}

pub(crate) fn mark_run_finished() {
    gauge!("scrape_last_run_ts").set(Utc::now().timestamp().max(0) as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{DateValue, RecordKey};

    fn rec(title: &str, link: &str) -> ProposalRecord {
        ProposalRecord {
            title: title.into(),
            agency: "DST".into(),
            start_date: DateValue::NotSpecified,
            end_date: DateValue::NotSpecified,
            link: link.into(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn delta_keeps_only_unseen_keys() {
        let records = vec![rec("Grant A call", "https://a"), rec("Grant B call", "https://b")];
        let mut existing = HashSet::new();
        existing.insert(RecordKey::new("Grant A call", "https://a"));
        let delta = compute_delta(&records, &existing);
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].link, "https://b");
    }

    #[test]
    fn delta_of_empty_store_is_everything() {
        let records = vec![rec("Grant A call", "https://a")];
        assert_eq!(compute_delta(&records, &HashSet::new()).len(), 1);
    }
}
