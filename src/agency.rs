// src/agency.rs
//! Agency resolution (source URL → agency code) and per-record attribution for
//! aggregator sources, where the agency has to be recovered from page content.
//!
//! Attribution order for aggregators, most to least confident:
//! 1. structured probes (pipe-table cell, `Agency:` / `Department ...:` labels)
//! 2. a bare agency code inside the title
//! 3. an embedded URL whose domain maps to a known agency
//! 4. `Multiple Agencies`

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::sources::Source;
use crate::proposal::{MULTIPLE_AGENCIES, UNKNOWN_AGENCY};

/// Ordered (domain fragment → code) table. First match wins; no fragment is a
/// substring of another.
pub const AGENCY_DOMAINS: &[(&str, &str)] = &[
    ("dst.gov.in", "DST"),
    ("serb.gov.in", "SERB"),
    ("anrfonline.in", "ANRF"),
    ("dbtindia.gov.in", "DBT"),
    ("birac.nic.in", "BIRAC"),
    ("icmr.gov.in", "ICMR"),
    ("csir.res.in", "CSIR"),
    ("meity.gov.in", "MeitY"),
    ("drdo.gov.in", "DRDO"),
    ("isro.gov.in", "ISRO"),
    ("moes.gov.in", "MoES"),
    ("mnre.gov.in", "MNRE"),
    ("ugc.gov.in", "UGC"),
    ("aicte-india.org", "AICTE"),
    ("icssr.org", "ICSSR"),
];

/// Sites that republish calls from many agencies.
pub const AGGREGATOR_DOMAINS: &[&str] = &["indiascienceandtechnology.gov.in"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgencyMatch {
    Code(&'static str),
    Aggregator,
    Unknown,
}

impl AgencyMatch {
    /// Display label for a record's `agency` field.
    pub fn label(&self) -> &'static str {
        match self {
            AgencyMatch::Code(c) => c,
            AgencyMatch::Aggregator => MULTIPLE_AGENCIES,
            AgencyMatch::Unknown => UNKNOWN_AGENCY,
        }
    }
}

/// Map a URL to an agency by case-insensitive domain-fragment containment.
pub fn resolve_agency(url: &str) -> AgencyMatch {
    let u = url.to_ascii_lowercase();
    if let Some((_, code)) = AGENCY_DOMAINS.iter().find(|(frag, _)| u.contains(frag)) {
        return AgencyMatch::Code(code);
    }
    if AGGREGATOR_DOMAINS.iter().any(|frag| u.contains(frag)) {
        return AgencyMatch::Aggregator;
    }
    AgencyMatch::Unknown
}

/// All known agency codes, in table order.
pub fn known_codes() -> impl Iterator<Item = &'static str> {
    AGENCY_DOMAINS.iter().map(|(_, code)| *code)
}

/// Canonical spelling of a code matched case-insensitively (e.g. `MEITY` → `MeitY`).
pub fn canonical_code(token: &str) -> Option<&'static str> {
    let t = token.trim();
    known_codes().find(|c| c.eq_ignore_ascii_case(t))
}

fn codes_alternation() -> String {
    let mut codes: Vec<&str> = known_codes().collect();
    codes.sort_by_key(|c| std::cmp::Reverse(c.len()));
    codes.join("|")
}

static STRUCTURED_PROBES: Lazy<Vec<Regex>> = Lazy::new(|| {
    let codes = codes_alternation();
    [
        format!(r"(?i)\|\s*({codes})\s*\|"),
        format!(r"(?i)\b(?:funding\s+)?agency\s*:\s*({codes})\b"),
        format!(r"(?i)\b(?:department|ministry)[^:\n|]{{0,80}}:\s*({codes})\b"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("agency probe regex"))
    .collect()
});

static TITLE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({})\b", codes_alternation())).expect("agency token regex")
});

static EMBEDDED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s)\]>"'|]+"#).expect("embedded url regex"));

/// Recover the agency for one record.
///
/// Non-aggregator sources answer from configuration/URL without looking at content.
pub fn attribute_agency(content: &str, title: &str, source: &Source) -> String {
    if !source.aggregator {
        return source.agency_label();
    }

    for probe in STRUCTURED_PROBES.iter() {
        if let Some(code) = probe
            .captures_iter(content)
            .filter_map(|c| c.get(1))
            .find_map(|m| canonical_code(m.as_str()))
        {
            return code.to_string();
        }
    }

    // A bare token counts only in canonical or all-caps spelling; lower-case words
    // like "dst" inside prose are too weak a signal.
    if let Some(code) = TITLE_TOKEN.find_iter(title).find_map(|m| {
        let raw = m.as_str();
        canonical_code(raw).filter(|c| raw == *c || raw == c.to_ascii_uppercase())
    }) {
        return code.to_string();
    }

    if let Some(code) = EMBEDDED_URL.find_iter(content).find_map(|m| match resolve_agency(m.as_str()) {
        AgencyMatch::Code(c) => Some(c),
        _ => None,
    }) {
        return code.to_string();
    }

    MULTIPLE_AGENCIES.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregator() -> Source {
        Source::new("https://www.indiascienceandtechnology.gov.in/funding-opportunities")
    }

    #[test]
    fn resolver_first_match_and_fallbacks() {
        assert_eq!(
            resolve_agency("https://serb.gov.in/page/show/63"),
            AgencyMatch::Code("SERB")
        );
        assert_eq!(
            resolve_agency("https://WWW.DST.GOV.IN/call-for-proposals"),
            AgencyMatch::Code("DST")
        );
        assert_eq!(
            resolve_agency("https://www.indiascienceandtechnology.gov.in/x"),
            AgencyMatch::Aggregator
        );
        assert_eq!(resolve_agency("https://example.org"), AgencyMatch::Unknown);
        assert_eq!(AgencyMatch::Unknown.label(), "Unknown Agency");
    }

    #[test]
    fn no_fragment_overlaps_another() {
        let frags: Vec<&str> = AGENCY_DOMAINS
            .iter()
            .map(|(f, _)| *f)
            .chain(AGGREGATOR_DOMAINS.iter().copied())
            .collect();
        for (i, a) in frags.iter().enumerate() {
            for (j, b) in frags.iter().enumerate() {
                if i != j {
                    assert!(!a.contains(b), "{a} contains {b}");
                }
            }
        }
    }

    #[test]
    fn non_aggregator_ignores_content() {
        let src = Source::new("https://dbtindia.gov.in/latest-announcement");
        let got = attribute_agency("Agency: ICMR", "ICMR grant call", &src);
        assert_eq!(got, "DBT");
    }

    #[test]
    fn structured_label_beats_title_token() {
        let got = attribute_agency(
            "Funding Agency: icmr\nmore text",
            "DST call for proposals",
            &aggregator(),
        );
        assert_eq!(got, "ICMR");
    }

    #[test]
    fn pipe_cell_probe() {
        let got = attribute_agency("| Research grant | DBT | 2025 |", "Research grant", &aggregator());
        assert_eq!(got, "DBT");
    }

    #[test]
    fn department_and_ministry_labels() {
        let got = attribute_agency(
            "Department of Biotechnology: dbt\nInvites applications",
            "Research grant call",
            &aggregator(),
        );
        assert_eq!(got, "DBT");

        let got = attribute_agency(
            "Issued by Ministry of Electronics and IT: MEITY",
            "Startup grant call",
            &aggregator(),
        );
        assert_eq!(got, "MeitY");
    }

    #[test]
    fn title_token_returns_canonical_literal() {
        let got = attribute_agency("no labels here", "MEITY startup grant call", &aggregator());
        assert_eq!(got, "MeitY");
    }

    #[test]
    fn embedded_url_then_give_up() {
        let got = attribute_agency(
            "Apply at https://birac.nic.in/desc_new.php?id=1 today",
            "Biotech ignition grant",
            &aggregator(),
        );
        assert_eq!(got, "BIRAC");

        let none = attribute_agency("nothing useful", "Innovation grant call", &aggregator());
        assert_eq!(none, "Multiple Agencies");
    }
}
