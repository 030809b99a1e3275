// src/extract/inline_links.rs
//! Strategy A: markdown `[title](url)` references anywhere on the page.
//! Dates and agency come from the whole page.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ExtractionStrategy, PageContext};
use crate::agency::attribute_agency;
use crate::dates::extract_date_range;
use crate::filters::{clean_title, is_proposal_title, should_skip_link};
use crate::config::sources::Source;
use crate::proposal::ProposalRecord;

static INLINE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("inline link regex"));

pub struct InlineLinks;

fn accepted(title: &str, url: &str, source: &Source) -> bool {
    is_proposal_title(title) && !should_skip_link(url, &source.url, source.aggregator)
}

/// Whether `line` carries a `[title](url)` pair this strategy keeps.
pub(crate) fn has_accepted_link(line: &str, source: &Source) -> bool {
    INLINE_LINK.captures_iter(line).any(|caps| match (caps.get(1), caps.get(2)) {
        (Some(t), Some(u)) => accepted(&clean_title(t.as_str()), u.as_str().trim(), source),
        _ => false,
    })
}

impl ExtractionStrategy for InlineLinks {
    fn name(&self) -> &'static str {
        "inline_links"
    }

    fn extract(&self, page: &PageContext<'_>) -> Vec<ProposalRecord> {
        let mut out = Vec::new();
        let mut page_dates = None;

        for caps in INLINE_LINK.captures_iter(page.content) {
            let (Some(raw_title), Some(raw_url)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let title = clean_title(raw_title.as_str());
            let url = raw_url.as_str().trim();
            if !accepted(&title, url, page.source) {
                continue;
            }

            let dates = page_dates
                .get_or_insert_with(|| extract_date_range(page.content))
                .clone();
            let agency = attribute_agency(page.content, &title, page.source);
            out.push(page.record(title, url, dates, agency));
        }
        out
    }
}
