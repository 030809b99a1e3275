// src/pipeline.rs
//! One full scrape run: fetch every source, extract, diff against the store,
//! insert what is new and announce it.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::sources::Source;
use crate::extract::ExtractionEngine;
use crate::ingest::retry::{Backoff, RetryPolicy};
use crate::ingest::types::{ContentFetcher, FetchError};
use crate::ingest::{compute_delta, ensure_metrics_described, mark_run_finished, run_batch, BatchConfig};
use crate::notify::{NewProposalsEvent, NotifierMux};
use crate::proposal::ProposalRecord;
use crate::store::{ProposalStore, StoreError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("could not authenticate to fetch service: {0}")]
    FetchAuth(#[source] FetchError),

    #[error("could not reach store: {0}")]
    Store(#[from] StoreError),

    #[error("a scrape run is already in progress")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub sources: usize,
    pub failed_sources: Vec<String>,
    pub empty_sources: Vec<String>,
    pub found: usize,
    pub new: usize,
    pub inserted: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Records this run inserted.
    #[serde(skip)]
    pub new_records: Vec<ProposalRecord>,
}

pub struct Pipeline {
    fetcher: Arc<dyn ContentFetcher>,
    store: Arc<dyn ProposalStore>,
    notifier: Arc<NotifierMux>,
    sources: Vec<Source>,
    batch: BatchConfig,
    store_retry: RetryPolicy,
    engine: ExtractionEngine,
    run_guard: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        store: Arc<dyn ProposalStore>,
        sources: Vec<Source>,
        batch: BatchConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            notifier: Arc::new(NotifierMux::disabled()),
            sources,
            batch,
            store_retry: RetryPolicy::new(
                3,
                Backoff::Exponential {
                    base: Duration::from_millis(200),
                    max: Duration::from_secs(2),
                },
            ),
            engine: ExtractionEngine::default(),
            run_guard: Mutex::new(()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<NotifierMux>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_engine(mut self, engine: ExtractionEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_store_retry(mut self, retry: RetryPolicy) -> Self {
        self.store_retry = retry;
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn store(&self) -> Arc<dyn ProposalStore> {
        Arc::clone(&self.store)
    }

    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Start a run unless one is already in flight.
    pub async fn try_run(&self) -> Result<RunSummary, RunError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| RunError::AlreadyRunning)?;
        self.run_locked().await
    }

    /// Wait for any in-flight run to finish, then run.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let _guard = self.run_guard.lock().await;
        self.run_locked().await
    }

    async fn run_locked(&self) -> Result<RunSummary, RunError> {
        ensure_metrics_described();
        counter!("scrape_runs_total").increment(1);
        let started_at = Utc::now();
        tracing::info!(target: "ingest", sources = self.sources.len(), fetcher = self.fetcher.name(), "scrape run started");

        let outcome = run_batch(self.fetcher.as_ref(), &self.sources, &self.batch, &self.engine)
            .await
            .map_err(RunError::FetchAuth)?;

        let store = self.store.as_ref();
        let existing = self
            .store_retry
            .run(
                "existing_keys",
                move |_| store.existing_keys(),
                StoreError::is_retryable,
            )
            .await?;

        let delta = compute_delta(&outcome.records, &existing);
        let batch = delta.as_slice();
        let inserted = if delta.is_empty() {
            Vec::new()
        } else {
            self.store_retry
                .run(
                    "insert_if_absent",
                    move |_| store.insert_if_absent(batch),
                    StoreError::is_retryable,
                )
                .await?
        };

        // Announce only rows this run wrote.
        if !inserted.is_empty() {
            let delivered = self
                .notifier
                .notify(&NewProposalsEvent::new(inserted.clone()))
                .await;
            tracing::debug!(target: "notify", delivered, "new proposals announced");
        }

        mark_run_finished();
        let summary = RunSummary {
            sources: outcome.sources_total,
            failed_sources: outcome.failed_sources,
            empty_sources: outcome.empty_sources,
            found: outcome.records.len(),
            new: delta.len(),
            inserted: inserted.len(),
            started_at,
            finished_at: Utc::now(),
            new_records: inserted,
        };
        tracing::info!(
            target: "ingest",
            found = summary.found,
            new = summary.new,
            inserted = summary.inserted,
            failed = summary.failed_sources.len(),
            "scrape run finished"
        );
        Ok(summary)
    }
}
