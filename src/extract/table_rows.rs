// src/extract/table_rows.rs
//! Strategy C: pipe-delimited pseudo-table rows (five or more cells), as produced
//! by markdown renderings of listing tables.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{find_urls, ExtractionStrategy, PageContext};
use crate::agency::{attribute_agency, canonical_code};
use crate::dates::extract_date_range;
use crate::filters::{clean_title, is_proposal_title, should_skip_link};
use crate::proposal::ProposalRecord;

pub(crate) static TABLE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\|(?:[^|\n]*\|){5,}\s*$").expect("table row regex"));

static CELL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\((https?://[^)\s]+)\)").expect("cell link regex"));

pub struct TableRows;

/// Absolute URL carried by a cell: a markdown link target first, else a bare URL.
fn cell_url(cell: &str) -> Option<&str> {
    if let Some(m) = CELL_LINK.captures(cell).and_then(|c| c.get(1)) {
        return Some(m.as_str());
    }
    find_urls(cell).next()
}

impl ExtractionStrategy for TableRows {
    fn name(&self) -> &'static str {
        "table_rows"
    }

    fn extract(&self, page: &PageContext<'_>) -> Vec<ProposalRecord> {
        let mut out = Vec::new();

        for line in page.content.lines().filter(|l| TABLE_ROW.is_match(l)) {
            let cells: Vec<&str> = line
                .trim()
                .trim_matches('|')
                .split('|')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();

            let title = cells
                .iter()
                .map(|c| clean_title(c))
                .find(|t| is_proposal_title(t));
            let link = cells.iter().find_map(|c| cell_url(c));
            let (Some(title), Some(link)) = (title, link) else {
                continue;
            };
            if should_skip_link(link, &page.source.url, page.source.aggregator) {
                continue;
            }

            let row_text = cells.join(" ");
            let dates = extract_date_range(&row_text);
            let agency = match cells.iter().find_map(|c| canonical_code(c)) {
                Some(code) => code.to_string(),
                None => attribute_agency(&row_text, &title, page.source),
            };
            out.push(page.record(title, link, dates, agency));
        }
        out
    }
}
