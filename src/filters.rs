// src/filters.rs
//! Candidate screening: which links are plausibly external proposal pages, which
//! text spans are plausibly proposal titles, and title clean-up.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Keywords that make a text span look like a funding call. Matched as
/// case-insensitive substrings.
pub const TITLE_KEYWORDS: &[&str] = &[
    "call",
    "proposal",
    "funding",
    "grant",
    "scheme",
    "research",
    "phd",
    "postdoc",
    "scientist",
    "startup",
    "fellowship",
    "application",
    "submission",
    "deadline",
    "award",
    "competition",
    "opportunity",
    "invitation",
    "tender",
    "r&d",
    "s&t",
];

pub const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CHARS: usize = 300;

const DENY_PATH_FRAGMENTS: &[&str] = &[
    "/contact",
    "/about",
    "/login",
    "/sitemap",
    "/register",
    "/privacy",
    "/feedback",
];

const DENY_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".doc", ".docx", ".xls",
    ".xlsx", ".csv", ".ppt", ".pptx", ".zip",
];

const DENY_DOMAINS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
    "youtu.be",
    "whatsapp.com",
    "t.me",
];

/// Second-level suffixes under which the registrable domain has three labels.
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "gov.in", "nic.in", "ac.in", "res.in", "co.in", "org.in", "edu.in", "net.in", "ernet.in",
];

/// Plausible-title test: long enough and mentions a funding keyword.
pub fn is_proposal_title(text: &str) -> bool {
    let t = text.trim();
    if t.chars().count() < MIN_TITLE_CHARS {
        return false;
    }
    let lower = t.to_lowercase();
    TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Decide whether a candidate link found on `source_url` should be skipped.
///
/// Same-site links are skipped for single-agency sources; aggregators keep them.
pub fn should_skip_link(candidate: &str, source_url: &str, aggregator: bool) -> bool {
    let c = candidate.trim();
    if !(c.starts_with("http://") || c.starts_with("https://")) {
        // also covers mailto:, tel:, javascript: and bare #fragment links
        return true;
    }
    if c.contains("...") || c.contains('\u{2026}') {
        return true;
    }
    if c.contains("](") || c.contains("![") {
        return true;
    }

    let Ok(url) = Url::parse(c) else {
        return true;
    };
    let Some(host) = url.host_str().map(|h| h.to_ascii_lowercase()) else {
        return true;
    };

    if DENY_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    {
        return true;
    }

    let path = url.path().to_ascii_lowercase();
    if DENY_PATH_FRAGMENTS.iter().any(|p| path.contains(p)) {
        return true;
    }
    if DENY_EXTENSIONS.iter().any(|e| path.ends_with(e)) {
        return true;
    }

    if !aggregator && is_same_site_navigation(&url, &host, source_url) {
        return true;
    }

    false
}

/// A link counts as same-site navigation when it shares the source's registrable
/// domain and either points at the site root or stays inside the source page's
/// own top-level section. Links into another section of the same site (an
/// application portal, a call's detail page) are kept.
fn is_same_site_navigation(link: &Url, link_host: &str, source_url: &str) -> bool {
    let Ok(source) = Url::parse(source_url.trim()) else {
        return false;
    };
    let Some(source_host) = source.host_str().map(|h| h.to_ascii_lowercase()) else {
        return false;
    };
    if registrable_domain(link_host) != registrable_domain(&source_host) {
        return false;
    }
    match first_segment(link) {
        None => true,
        Some(seg) => first_segment(&source).is_some_and(|s| s.eq_ignore_ascii_case(&seg)),
    }
}

fn first_segment(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segs| segs.find(|s| !s.is_empty()))
        .map(|s| s.to_string())
}

/// `www.serb.gov.in` → `serb.gov.in`, `news.example.com` → `example.com`.
pub fn registrable_domain(host: &str) -> String {
    let h = host.trim_end_matches('.').to_ascii_lowercase();
    let h = h.strip_prefix("www.").unwrap_or(&h);
    let labels: Vec<&str> = h.split('.').filter(|l| !l.is_empty()).collect();
    let keep = if labels.len() >= 3
        && SECOND_LEVEL_SUFFIXES
            .iter()
            .any(|sfx| h.ends_with(&format!(".{sfx}")))
    {
        3
    } else {
        2
    };
    let start = labels.len().saturating_sub(keep);
    labels[start..].join(".")
}

static RE_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("md image regex"));
static RE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("md link regex"));
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_LEADING_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[#>*+\-•]+\s*|\d{1,3}[.)]\s+)+").expect("marker regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Turn a raw markdown/HTML span into a display title.
pub fn clean_title(raw: &str) -> String {
    let mut out = html_escape::decode_html_entities(raw).to_string();
    out = RE_TAGS.replace_all(&out, " ").to_string();
    out = RE_IMAGE.replace_all(&out, " ").to_string();
    out = RE_LINK.replace_all(&out, "$1").to_string();
    out = out.replace("**", "").replace("__", "").replace('`', "");
    out = RE_WS.replace_all(&out, " ").trim().to_string();
    out = RE_LEADING_MARKERS.replace(&out, "").to_string();

    let out = out
        .trim()
        .trim_end_matches([':', ';', ',', '.', '|', '-', '*'])
        .trim();
    if out.chars().count() > MAX_TITLE_CHARS {
        out.chars().take(MAX_TITLE_CHARS).collect()
    } else {
        out.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERB: &str = "https://serb.gov.in/page/show/63";

    #[test]
    fn title_needs_length_and_keyword() {
        assert!(is_proposal_title("SERB Core Research Grant Call 2025"));
        assert!(is_proposal_title("Joint R&D programme with Japan"));
        assert!(!is_proposal_title("Grant"));
        assert!(!is_proposal_title("Annual report of the department"));
    }

    #[test]
    fn rejects_malformed_and_artifacts() {
        assert!(should_skip_link("/relative/path", SERB, false));
        assert!(should_skip_link("mailto:info@dst.gov.in", SERB, false));
        assert!(should_skip_link("https://example.com/very/long...", SERB, false));
        assert!(should_skip_link(
            "http://example.com/a](http://example.com/b)",
            SERB,
            true
        ));
        assert!(should_skip_link("https://example.com/![img", SERB, true));
        assert!(should_skip_link("https://exa mple.com/x", SERB, true));
    }

    #[test]
    fn rejects_denylisted() {
        assert!(should_skip_link("https://www.facebook.com/DSTIndia", SERB, false));
        assert!(should_skip_link("https://example.org/contact-us", SERB, false));
        assert!(should_skip_link("https://example.org/banner.PNG", SERB, false));
        assert!(should_skip_link("https://example.org/form.docx", SERB, false));
        assert!(!should_skip_link("https://example.org/call.pdf", SERB, false));
    }

    #[test]
    fn same_site_rules_depend_on_aggregator_flag() {
        // inside the source's own section
        assert!(should_skip_link("https://serb.gov.in/page/show/12", SERB, false));
        assert!(should_skip_link("https://www.serb.gov.in/", SERB, false));
        // another section of the same site is a proposal page
        assert!(!should_skip_link("https://serb.gov.in/crg/apply", SERB, false));

        let agg = "https://www.indiascienceandtechnology.gov.in/funding-opportunities";
        let inner = "https://www.indiascienceandtechnology.gov.in/funding-opportunities/123";
        assert!(should_skip_link(inner, agg, false));
        assert!(!should_skip_link(inner, agg, true));
    }

    #[test]
    fn registrable_domains() {
        assert_eq!(registrable_domain("www.serb.gov.in"), "serb.gov.in");
        assert_eq!(registrable_domain("onlinedst.gov.in"), "onlinedst.gov.in");
        assert_eq!(registrable_domain("news.example.com"), "example.com");
    }

    #[test]
    fn clean_title_strips_markup() {
        assert_eq!(
            clean_title("- **[Call for Proposals 2025](https://x.test/a)**:"),
            "Call for Proposals 2025"
        );
        assert_eq!(clean_title("## Indo&ndash;German grant &amp; award"), "Indo–German grant & award");
        assert_eq!(clean_title("1. Research <b>fellowship</b>"), "Research fellowship");
    }
}
