// src/extract/text_blocks.rs
//! Strategy B: prose lines that read like a call title, paired with the first
//! acceptable URL within a few lines of them.

use super::inline_links::has_accepted_link;
use super::table_rows::TABLE_ROW;
use super::{find_urls, ExtractionStrategy, PageContext};
use crate::agency::attribute_agency;
use crate::config::sources::Source;
use crate::dates::extract_date_range;
use crate::filters::{clean_title, is_proposal_title, should_skip_link};
use crate::proposal::ProposalRecord;

pub struct TextBlocks {
    pub lines_before: usize,
    pub lines_after: usize,
}

impl Default for TextBlocks {
    fn default() -> Self {
        Self {
            lines_before: 3,
            lines_after: 4,
        }
    }
}

/// Lines another strategy turns into a record: full table rows, and lines whose
/// inline link already passes both screens.
fn owned_elsewhere(line: &str, source: &Source) -> bool {
    TABLE_ROW.is_match(line) || has_accepted_link(line, source)
}

/// Title of a line: the first qualifying cell of a short pipe row, else the whole line.
fn line_title(line: &str) -> Option<String> {
    let t = line.trim();
    if t.starts_with('|') {
        return t
            .trim_matches('|')
            .split('|')
            .map(clean_title)
            .find(|c| is_proposal_title(c));
    }
    let title = clean_title(t);
    is_proposal_title(&title).then_some(title)
}

impl ExtractionStrategy for TextBlocks {
    fn name(&self) -> &'static str {
        "text_blocks"
    }

    fn extract(&self, page: &PageContext<'_>) -> Vec<ProposalRecord> {
        let lines: Vec<&str> = page.content.lines().collect();
        let mut out = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if owned_elsewhere(line, page.source) {
                continue;
            }
            let Some(title) = line_title(line) else {
                continue;
            };

            let lo = i.saturating_sub(self.lines_before);
            let hi = (i + self.lines_after).min(lines.len() - 1);
            let window = lines[lo..=hi].join("\n");

            let Some(link) = find_urls(&window)
                .find(|u| !should_skip_link(u, &page.source.url, page.source.aggregator))
            else {
                continue;
            };

            let dates = extract_date_range(&window);
            let agency = attribute_agency(&window, &title, page.source);
            out.push(page.record(title, link, dates, agency));
        }
        out
    }
}
