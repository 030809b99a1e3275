// tests/ingest_scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use grant_scout::config::Source;
use grant_scout::ingest::providers::FixtureFetcher;
use grant_scout::ingest::scheduler::{spawn_scrape_scheduler, ScrapeSchedulerCfg};
use grant_scout::ingest::BatchConfig;
use grant_scout::store::{MemoryStore, ProposalStore};
use grant_scout::Pipeline;

const SERB: &str = "https://serb.gov.in/page/show/63";

fn pipeline(store: Arc<MemoryStore>) -> Arc<Pipeline> {
    let fetcher = FixtureFetcher::new().with_markdown(SERB, include_str!("fixtures/serb_page.md"));
    Arc::new(Pipeline::new(
        Arc::new(fetcher),
        store,
        vec![Source::new(SERB)],
        BatchConfig::immediate(),
    ))
}

#[tokio::test(start_paused = true)]
async fn run_on_start_fires_immediately() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_scrape_scheduler(
        ScrapeSchedulerCfg {
            interval: Duration::from_secs(3600),
            run_on_start: true,
        },
        pipeline(store.clone()),
    );
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(store.count().await.unwrap(), 1);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn first_run_waits_one_interval_by_default() {
    let store = Arc::new(MemoryStore::new());
    let handle = spawn_scrape_scheduler(
        ScrapeSchedulerCfg {
            interval: Duration::from_secs(3600),
            run_on_start: false,
        },
        pipeline(store.clone()),
    );
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.count().await.unwrap(), 0);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(store.count().await.unwrap(), 1);
    handle.abort();
}
