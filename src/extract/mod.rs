// src/extract/mod.rs
//! Page-level extraction: runs each strategy over one page's text and merges the
//! results by record identity, first writer wins.

pub mod inline_links;
pub mod table_rows;
pub mod text_blocks;

use chrono::{DateTime, Utc};
use metrics::histogram;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::sources::Source;
use crate::dates::DateRange;
use crate::proposal::{dedup_first_wins, ProposalRecord};

pub use inline_links::InlineLinks;
pub use table_rows::TableRows;
pub use text_blocks::TextBlocks;

/// One page as seen by the strategies.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub content: &'a str,
    pub source: &'a Source,
    pub extracted_at: DateTime<Utc>,
}

impl<'a> PageContext<'a> {
    pub(crate) fn record(
        &self,
        title: String,
        link: &str,
        dates: DateRange,
        agency: String,
    ) -> ProposalRecord {
        let (start_date, end_date) = dates.into_fields();
        ProposalRecord {
            title,
            agency,
            start_date,
            end_date,
            link: link.trim().to_string(),
            extracted_at: self.extracted_at,
        }
    }
}

pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, page: &PageContext<'_>) -> Vec<ProposalRecord>;
}

/// Absolute URLs in free text. Stops at whitespace, closing brackets, quotes and pipes.
pub(crate) static ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s)\]>"'|<]+"#).expect("absolute url regex"));

/// Absolute URLs in `text`, with trailing sentence punctuation removed.
pub(crate) fn find_urls<'a>(text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    ABSOLUTE_URL
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
}

pub struct ExtractionEngine {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new(vec![
            Box::new(InlineLinks),
            Box::new(TextBlocks::default()),
            Box::new(TableRows),
        ])
    }
}

impl ExtractionEngine {
    /// Strategies run in the given order; earlier ones win on duplicate keys.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn extract(
        &self,
        content: &str,
        source: &Source,
        extracted_at: DateTime<Utc>,
    ) -> Vec<ProposalRecord> {
        let t0 = std::time::Instant::now();
        let page = PageContext {
            content,
            source,
            extracted_at,
        };

        let mut all = Vec::new();
        for s in &self.strategies {
            let found = s.extract(&page);
            tracing::debug!(
                target: "extract",
                strategy = s.name(),
                source = %source.url,
                found = found.len(),
                "strategy finished"
            );
            all.extend(found);
        }

        let (merged, dup) = dedup_first_wins(all);
        histogram!("extract_page_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::debug!(
            target: "extract",
            source = %source.url,
            kept = merged.len(),
            duplicates = dup,
            "page merged"
        );
        merged
    }
}
