// src/config/sources.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agency::{resolve_agency, AgencyMatch};

pub const ENV_SOURCES_PATH: &str = "SOURCES_CONFIG_PATH";

/// One configured page to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    /// Explicit agency code; when absent the URL decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    /// Aggregators carry calls from many agencies; attribution comes from content.
    #[serde(default)]
    pub aggregator: bool,
}

impl Source {
    /// Build a source whose aggregator flag is derived from the agency table.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            agency: None,
            aggregator: resolve_agency(url) == AgencyMatch::Aggregator,
        }
    }

    pub fn with_agency(mut self, code: &str) -> Self {
        self.agency = Some(code.to_string());
        self
    }

    pub fn aggregator(mut self, flag: bool) -> Self {
        self.aggregator = flag;
        self
    }

    /// Agency for records of a non-aggregator source.
    pub fn agency_label(&self) -> String {
        match &self.agency {
            Some(a) if !a.trim().is_empty() => a.trim().to_string(),
            _ => resolve_agency(&self.url).label().to_string(),
        }
    }
}

/// Built-in source list used when no config file is present.
pub fn default_sources() -> Vec<Source> {
    [
        "https://dst.gov.in/call-for-proposals",
        "https://serb.gov.in/page/show/63",
        "https://anrfonline.in/ANRF/HomePage",
        "https://dbtindia.gov.in/latest-announcement",
        "https://birac.nic.in/cfp.php",
        "https://www.icmr.gov.in/call-for-proposals",
        "https://www.csir.res.in/grants-schemes",
        "https://www.meity.gov.in/schemes-and-services",
        "https://www.drdo.gov.in/drdo/grants-in-aid",
        "https://www.isro.gov.in/RESPOND.html",
        "https://www.indiascienceandtechnology.gov.in/funding-opportunities",
    ]
    .into_iter()
    .map(Source::new)
    .collect()
}

/// Load sources from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using env var + fallbacks:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in list
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(default_sources())
}

/// Entries may be bare URLs or full tables.
#[derive(Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Url(String),
    Full {
        url: String,
        #[serde(default)]
        agency: Option<String>,
        #[serde(default)]
        aggregator: Option<bool>,
    },
}

impl From<SourceEntry> for Source {
    fn from(e: SourceEntry) -> Self {
        match e {
            SourceEntry::Url(u) => Source::new(&u),
            SourceEntry::Full {
                url,
                agency,
                aggregator,
            } => {
                let mut s = Source::new(&url);
                s.agency = agency.map(|a| a.trim().to_string()).filter(|a| !a.is_empty());
                if let Some(flag) = aggregator {
                    s.aggregator = flag;
                }
                s
            }
        }
    }
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]") || s.contains("sources =");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(Deserialize)]
    struct TomlSources {
        sources: Vec<SourceEntry>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let v: Vec<SourceEntry> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop empty URLs, dedup by URL keeping the first entry and file order.
fn clean_list(items: Vec<SourceEntry>) -> Vec<Source> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for it in items {
        let src = Source::from(it);
        if src.url.is_empty() {
            continue;
        }
        if seen.insert(src.url.clone()) {
            out.push(src);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_tables_and_bare_urls() {
        let toml = r#"
[[sources]]
url = " https://dst.gov.in/call-for-proposals "

[[sources]]
url = "https://example.org/calls"
aggregator = true

[[sources]]
url = "https://example.net/funding"
agency = "ICMR"

[[sources]]
url = ""

[[sources]]
url = "https://dst.gov.in/call-for-proposals"
"#;
        let v = parse_toml(toml).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].url, "https://dst.gov.in/call-for-proposals");
        assert!(!v[0].aggregator);
        assert!(v[1].aggregator);
        assert_eq!(v[2].agency_label(), "ICMR");
    }

    #[test]
    fn json_accepts_strings() {
        let json = r#"["https://www.indiascienceandtechnology.gov.in/funding", "  "]"#;
        let v = parse_json(json).unwrap();
        assert_eq!(v.len(), 1);
        assert!(v[0].aggregator, "aggregator derived from the agency table");
    }

    #[test]
    fn defaults_cover_one_aggregator() {
        let v = default_sources();
        assert_eq!(v.iter().filter(|s| s.aggregator).count(), 1);
        assert!(v.iter().all(|s| s.url.starts_with("https://")));
    }
}
