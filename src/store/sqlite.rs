// src/store/sqlite.rs
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{total_pages, Page, ProposalStore, StoreError};
use crate::proposal::{DateValue, ProposalRecord, RecordKey, StoredProposal};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS proposals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    agency TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    link TEXT NOT NULL,
    extracted_at TEXT NOT NULL,
    created_at TEXT NOT NULL,     -- fixed-width RFC 3339, sorts as text
    UNIQUE (title, link)
);

CREATE INDEX IF NOT EXISTS idx_proposals_listing ON proposals (created_at DESC, end_date ASC);
CREATE INDEX IF NOT EXISTS idx_proposals_agency ON proposals (agency);
"#;

const COLUMNS: &str = "id, title, agency, start_date, end_date, link, extracted_at, created_at";
/// Newest run first; inside a run, ISO deadlines ascending ahead of every non-date value.
const ORDERING: &str = "ORDER BY created_at DESC, \
     CASE WHEN end_date GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]' THEN 0 ELSE 1 END, \
     end_date ASC, id ASC";

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_default()
}

fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<StoredProposal> {
    let start: String = row.get(3)?;
    let end: String = row.get(4)?;
    let extracted_at: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(StoredProposal {
        id: row.get(0)?,
        record: ProposalRecord {
            title: row.get(1)?,
            agency: row.get(2)?,
            start_date: DateValue::parse(&start),
            end_date: DateValue::parse(&end),
            link: row.get(5)?,
            extracted_at: parse_ts(&extracted_at),
        },
        created_at: parse_ts(&created_at),
    })
}

/// SQLite-backed store. One connection behind a mutex; every call runs on the
/// blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (creating parent directories and schema as needed).
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("creating {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn query_where(
        conn: &Connection,
        clause: &str,
        needle: &str,
    ) -> Result<Vec<StoredProposal>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM proposals WHERE {clause} {ORDERING}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![needle], row_to_stored)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[async_trait]
impl ProposalStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_if_absent(
        &self,
        records: &[ProposalRecord],
    ) -> Result<Vec<ProposalRecord>, StoreError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let records = records.to_vec();
        let inserted = self
            .with_conn(move |conn| {
                let created_at = ts(&Utc::now());
                let tx = conn.transaction()?;
                let mut inserted = Vec::new();
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO proposals (title, agency, start_date, end_date, link, extracted_at, created_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )?;
                    for r in records {
                        let changed = stmt.execute(params![
                            r.title.trim(),
                            r.agency,
                            r.start_date.to_string(),
                            r.end_date.to_string(),
                            r.link.trim(),
                            ts(&r.extracted_at),
                            created_at,
                        ])?;
                        if changed > 0 {
                            inserted.push(r);
                        }
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        tracing::debug!(target: "store", inserted = inserted.len(), "insert_if_absent");
        Ok(inserted)
    }

    async fn existing_keys(&self) -> Result<HashSet<RecordKey>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT title, link FROM proposals")?;
            let rows = stmt.query_map([], |row| {
                let title: String = row.get(0)?;
                let link: String = row.get(1)?;
                Ok(RecordKey::new(&title, &link))
            })?;
            Ok(rows.collect::<rusqlite::Result<HashSet<_>>>()?)
        })
        .await
    }

    async fn list(&self, page: u32, limit: u32) -> Result<Page, StoreError> {
        let page = page.max(1);
        let limit = limit.max(1);
        self.with_conn(move |conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM proposals", [], |r| r.get(0))?;
            let offset = i64::from(page - 1) * i64::from(limit);
            let sql = format!("SELECT {COLUMNS} FROM proposals {ORDERING} LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql)?;
            let proposals = stmt
                .query_map(params![i64::from(limit), offset], row_to_stored)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let total = total.max(0) as u64;
            Ok(Page {
                proposals,
                page,
                limit,
                total,
                total_pages: total_pages(total, limit),
            })
        })
        .await
    }

    async fn by_agency(&self, agency: &str) -> Result<Vec<StoredProposal>, StoreError> {
        let needle = agency.to_string();
        self.with_conn(move |conn| {
            Self::query_where(conn, "instr(lower(agency), lower(?1)) > 0", &needle)
        })
        .await
    }

    async fn search(&self, query: &str) -> Result<Vec<StoredProposal>, StoreError> {
        let needle = query.to_string();
        self.with_conn(move |conn| {
            Self::query_where(
                conn,
                "instr(lower(title), lower(?1)) > 0 OR instr(lower(agency), lower(?1)) > 0",
                &needle,
            )
        })
        .await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM proposals", [], |r| r.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
    }
}
