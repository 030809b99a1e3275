// src/store/memory.rs
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Mutex;

use super::{total_pages, Page, ProposalStore, StoreError};
use crate::proposal::{ProposalRecord, RecordKey, StoredProposal};

/// Process-local store with the same contract as the SQLite one.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<StoredProposal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Vec<StoredProposal>, StoreError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        let mut out = rows.clone();
        out.sort_by(listing_order);
        Ok(out)
    }
}

fn listing_order(a: &StoredProposal, b: &StoredProposal) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.record.end_date.deadline_cmp(&b.record.end_date))
        .then_with(|| {
            a.record
                .end_date
                .to_string()
                .cmp(&b.record.end_date.to_string())
        })
        .then_with(|| a.id.cmp(&b.id))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl ProposalStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert_if_absent(
        &self,
        records: &[ProposalRecord],
    ) -> Result<Vec<ProposalRecord>, StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        let mut keys: HashSet<RecordKey> = rows.iter().map(|r| r.record.key()).collect();
        let created_at = Utc::now();
        let mut inserted = Vec::new();
        for r in records {
            if !keys.insert(r.key()) {
                continue;
            }
            let id = rows.len() as i64 + 1;
            let mut record = r.clone();
            record.title = record.title.trim().to_string();
            record.link = record.link.trim().to_string();
            rows.push(StoredProposal {
                id,
                record,
                created_at,
            });
            inserted.push(r.clone());
        }
        Ok(inserted)
    }

    async fn existing_keys(&self) -> Result<HashSet<RecordKey>, StoreError> {
        Ok(self.snapshot()?.iter().map(|r| r.record.key()).collect())
    }

    async fn list(&self, page: u32, limit: u32) -> Result<Page, StoreError> {
        let all = self.snapshot()?;
        let total = all.len() as u64;
        let offset = (page.max(1) as usize - 1) * limit as usize;
        let proposals = all.into_iter().skip(offset).take(limit as usize).collect();
        Ok(Page {
            proposals,
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        })
    }

    async fn by_agency(&self, agency: &str) -> Result<Vec<StoredProposal>, StoreError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|r| contains_ci(&r.record.agency, agency))
            .collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<StoredProposal>, StoreError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|r| contains_ci(&r.record.title, query) || contains_ci(&r.record.agency, query))
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.snapshot()?.len() as u64)
    }
}
