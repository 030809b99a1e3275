// src/proposal.rs
//! Proposal records: the unit of extraction, its identity key, and the date values
//! carried on each record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

pub const ROLLING_DEADLINE: &str = "Rolling Deadline";
pub const NOT_SPECIFIED: &str = "Not specified";
pub const UNKNOWN_AGENCY: &str = "Unknown Agency";
pub const MULTIPLE_AGENCIES: &str = "Multiple Agencies";

/// A start/end date as carried on a record.
///
/// Serializes to the exact strings stored and served: `yyyy-MM-dd`, the
/// `Rolling Deadline` / `Not specified` sentinels, or the raw unparsed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DateValue {
    Iso(NaiveDate),
    Rolling,
    NotSpecified,
    Raw(String),
}

impl DateValue {
    /// Read a stored/serialized value back. Never fails: unknown text becomes `Raw`.
    pub fn parse(s: &str) -> Self {
        let t = s.trim();
        if t.is_empty() || t == NOT_SPECIFIED {
            return DateValue::NotSpecified;
        }
        if t == ROLLING_DEADLINE {
            return DateValue::Rolling;
        }
        match NaiveDate::parse_from_str(t, "%Y-%m-%d") {
            Ok(d) => DateValue::Iso(d),
            Err(_) => DateValue::Raw(t.to_string()),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Iso(d) => Some(*d),
            _ => None,
        }
    }

    /// Deadline ordering: real dates ascending, everything else after them and
    /// equal to each other (so a stable sort keeps their input order).
    pub fn deadline_cmp(&self, other: &Self) -> Ordering {
        match (self.as_date(), other.as_date()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Iso(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateValue::Rolling => f.write_str(ROLLING_DEADLINE),
            DateValue::NotSpecified => f.write_str(NOT_SPECIFIED),
            DateValue::Raw(s) => f.write_str(s),
        }
    }
}

impl Serialize for DateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DateValue::parse(&s))
    }
}

/// Identity of a proposal: `(title, link)` after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub title: String,
    pub link: String,
}

impl RecordKey {
    pub fn new(title: &str, link: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            link: link.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    pub title: String,
    pub agency: String,
    pub start_date: DateValue,
    pub end_date: DateValue,
    pub link: String,
    pub extracted_at: DateTime<Utc>,
}

impl ProposalRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.title, &self.link)
    }
}

/// A record as read back from the store, with its server-assigned identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProposal {
    pub id: i64,
    #[serde(flatten)]
    pub record: ProposalRecord,
    pub created_at: DateTime<Utc>,
}

/// Keep the first record seen for each key, preserving input order.
/// Returns the kept records and how many were dropped.
pub fn dedup_first_wins(records: Vec<ProposalRecord>) -> (Vec<ProposalRecord>, usize) {
    let mut seen: HashSet<RecordKey> = HashSet::with_capacity(records.len());
    let mut keep = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for r in records {
        if seen.insert(r.key()) {
            keep.push(r);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// Stable ascending sort by end date; non-date end values go last.
pub fn sort_by_deadline(records: &mut [ProposalRecord]) {
    records.sort_by(|a, b| a.end_date.deadline_cmp(&b.end_date));
}
