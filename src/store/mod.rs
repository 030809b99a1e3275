// src/store/mod.rs
//! Durable proposal storage. Uniqueness on `(title, link)` is enforced by the
//! backend itself, so concurrent inserts of the same key cannot both land.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use crate::proposal::{ProposalRecord, RecordKey, StoredProposal};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store task failed: {0}")]
    Task(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Task(_) => true,
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            StoreError::Sqlite(_) => false,
        }
    }
}

/// One page of the listing, plus what a client needs to page further.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub proposals: Vec<StoredProposal>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Clamp user paging input: page >= 1, limit in `1..=MAX_PAGE_LIMIT`.
pub fn clamp_paging(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

pub(crate) fn total_pages(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1)))
}

/// Reads return newest first, then soonest deadline.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    /// Insert records whose key is not yet present. Returns the records actually
    /// inserted, in input order.
    async fn insert_if_absent(
        &self,
        records: &[ProposalRecord],
    ) -> Result<Vec<ProposalRecord>, StoreError>;

    async fn existing_keys(&self) -> Result<HashSet<RecordKey>, StoreError>;

    async fn list(&self, page: u32, limit: u32) -> Result<Page, StoreError>;

    /// Case-insensitive substring match on the agency label.
    async fn by_agency(&self, agency: &str) -> Result<Vec<StoredProposal>, StoreError>;

    /// Case-insensitive substring match on title or agency.
    async fn search(&self, query: &str) -> Result<Vec<StoredProposal>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_is_clamped() {
        assert_eq!(clamp_paging(None, None), (1, 20));
        assert_eq!(clamp_paging(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_paging(Some(3), Some(500)), (3, 100));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(41, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
    }
}
