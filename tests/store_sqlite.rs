// tests/store_sqlite.rs
use chrono::Utc;
use grant_scout::proposal::{DateValue, ProposalRecord, RecordKey};
use grant_scout::store::{MemoryStore, ProposalStore, SqliteStore};
use std::sync::Arc;

fn rec(title: &str, link: &str, agency: &str, end: &str) -> ProposalRecord {
    ProposalRecord {
        title: title.into(),
        agency: agency.into(),
        start_date: DateValue::NotSpecified,
        end_date: DateValue::parse(end),
        link: link.into(),
        extracted_at: Utc::now(),
    }
}

fn batch() -> Vec<ProposalRecord> {
    vec![
        rec("ICMR extramural research call", "https://icmr.gov.in/a", "ICMR", "Not specified"),
        rec("DST fellowship scheme", "https://dst.gov.in/b", "DST", "2025-09-30"),
        rec("CSIR grant call", "https://csir.res.in/c", "CSIR", "2025-07-01"),
    ]
}

async fn exercise(store: Arc<dyn ProposalStore>) {
    assert_eq!(store.insert_if_absent(&batch()).await.unwrap().len(), 3);
    // same keys again (with padding) are ignored, not errors
    let again = vec![rec(" DST fellowship scheme ", "https://dst.gov.in/b ", "SERB", "2026-01-01")];
    assert_eq!(store.insert_if_absent(&again).await.unwrap().len(), 0);
    assert_eq!(store.count().await.unwrap(), 3);

    let keys = store.existing_keys().await.unwrap();
    assert!(keys.contains(&RecordKey::new("DST fellowship scheme", "https://dst.gov.in/b")));

    // one run shares created_at, so soonest deadline comes first
    let page = store.list(1, 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    let ends: Vec<String> = page
        .proposals
        .iter()
        .map(|p| p.record.end_date.to_string())
        .collect();
    assert_eq!(ends, vec!["2025-07-01", "2025-09-30"]);
    let rest = store.list(2, 2).await.unwrap();
    assert_eq!(rest.proposals.len(), 1);
    assert_eq!(rest.proposals[0].record.end_date, DateValue::NotSpecified);

    let dst = store.by_agency("dst").await.unwrap();
    assert_eq!(dst.len(), 1);
    assert_eq!(dst[0].record.agency, "DST");

    let hits = store.search("GRANT").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.title, "CSIR grant call");
    assert!(store.search("nothing-like-this").await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("proposals.db");
    let store = SqliteStore::open(&path).unwrap();
    exercise(Arc::new(store)).await;
    assert!(path.exists());
}

#[tokio::test]
async fn memory_store_contract() {
    exercise(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proposals.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        store.insert_if_absent(&batch()).await.unwrap();
    }
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.count().await.unwrap(), 3);
    let page = store.list(1, 20).await.unwrap();
    let first = &page.proposals[0];
    assert!(first.id > 0);
    assert_eq!(first.record.start_date, DateValue::NotSpecified);
}

#[tokio::test]
async fn newer_runs_list_first() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
        .insert_if_absent(&[rec("Old grant call", "https://x.test/old", "DST", "2025-01-01")])
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .insert_if_absent(&[rec("New grant call", "https://x.test/new", "DST", "2026-01-01")])
        .await
        .unwrap();
    let page = store.list(1, 20).await.unwrap();
    assert_eq!(page.proposals[0].record.title, "New grant call");
}

async fn unparsed_deadlines_follow_real_dates(store: Arc<dyn ProposalStore>) {
    let run = vec![
        rec("Legacy grant call", "https://x.test/legacy", "DST", "15/03/1999"),
        rec("Rolling fellowship scheme", "https://x.test/rolling", "DST", "Rolling Deadline"),
        rec("Quantum research call", "https://x.test/quantum", "DST", "2025-08-01"),
    ];
    store.insert_if_absent(&run).await.unwrap();
    let page = store.list(1, 20).await.unwrap();
    let ends: Vec<String> = page
        .proposals
        .iter()
        .map(|p| p.record.end_date.to_string())
        .collect();
    assert_eq!(ends[0], "2025-08-01");
    assert_eq!(ends.len(), 3);
}

#[tokio::test]
async fn sqlite_lists_dates_before_raw_values() {
    unparsed_deadlines_follow_real_dates(Arc::new(SqliteStore::open_in_memory().unwrap())).await;
}

#[tokio::test]
async fn memory_lists_dates_before_raw_values() {
    unparsed_deadlines_follow_real_dates(Arc::new(MemoryStore::new())).await;
}
