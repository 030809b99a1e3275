// src/dates.rs
//! Free-text date handling: normalizing a single date expression, and pulling a
//! start/end pair out of a block of page text.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use crate::proposal::DateValue;

/// Parsed dates older than this year are treated as misparses or stale notices.
pub const MIN_ACCEPTED_YEAR: i32 = 2024;

/// (chrono layout, input is month+year only and needs a day prepended)
const LAYOUTS: &[(&str, bool)] = &[
    ("%d/%m/%Y", false),
    ("%d-%m-%Y", false),
    ("%m/%d/%Y", false),
    ("%m-%d-%Y", false),
    ("%Y-%m-%d", false),
    ("%Y/%m/%d", false),
    ("%d %B %Y", false),
    ("%d %b %Y", false),
    ("%d-%b-%Y", false),
    ("%B %d, %Y", false),
    ("%B %d %Y", false),
    ("%b %d, %Y", false),
    ("%b %d %Y", false),
    ("%d/%m/%y", false),
    ("%d-%m-%y", false),
    ("%B %Y", true),
    ("%b %Y", true),
];

static CONTINUOUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:rolling|ongoing|continuous|open|throughout|year)\b")
        .expect("continuous vocabulary regex")
});

static ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal regex"));

static SEPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsept\b").expect("sept regex"));

static WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize one date expression.
///
/// - empty input → `None`
/// - continuous-deadline wording → `Rolling`
/// - first layout giving a real date in or after [`MIN_ACCEPTED_YEAR`] → `Iso`
/// - anything else → `Raw` with the trimmed original text
pub fn normalize_date(input: &str) -> Option<DateValue> {
    let original = input.trim();
    if original.is_empty() {
        return None;
    }
    if CONTINUOUS.is_match(original) {
        return Some(DateValue::Rolling);
    }

    let cleaned = clean_for_parse(original);
    for (layout, month_only) in LAYOUTS {
        let parsed = if *month_only {
            let fmt = format!("%d {layout}");
            NaiveDate::parse_from_str(&format!("1 {cleaned}"), &fmt)
        } else {
            NaiveDate::parse_from_str(&cleaned, layout)
        };
        if let Ok(d) = parsed {
            if d.year() >= MIN_ACCEPTED_YEAR {
                return Some(DateValue::Iso(d));
            }
        }
    }

    Some(DateValue::Raw(original.to_string()))
}

fn clean_for_parse(s: &str) -> String {
    let s = ORDINAL.replace_all(s, "$1");
    let s = SEPT.replace_all(&s, "Sep");
    // "Dec. 31" → "Dec 31"
    let s = s.replace(". ", " ");
    let s = WS.replace_all(&s, " ");
    s.trim()
        .trim_end_matches(['.', ',', ';', ':'])
        .trim()
        .to_string()
}

/// Start/end pair derived from a block of text. `None` means nothing was asserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateValue>,
    pub end: Option<DateValue>,
}

impl DateRange {
    /// Record fields, with `Not specified` for anything missing.
    pub fn into_fields(self) -> (DateValue, DateValue) {
        (
            self.start.unwrap_or(DateValue::NotSpecified),
            self.end.unwrap_or(DateValue::NotSpecified),
        )
    }
}

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?";

fn date_token_pattern() -> String {
    let alts = [
        format!(r"\d{{1,2}}(?:st|nd|rd|th)?[\s-]+{MONTH},?[\s-]+\d{{4}}"),
        format!(r"{MONTH}\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}"),
        r"\d{4}[/-]\d{1,2}[/-]\d{1,2}".to_string(),
        r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}".to_string(),
        format!(r"{MONTH},?\s+\d{{4}}"),
    ];
    format!(r"\b(?:{})\b", alts.join("|"))
}

static DATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("(?i){}", date_token_pattern())).expect("date token regex"));

static DEADLINE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:deadline|due\s+date|due|submi(?:t|tted|ssion)|last\s+date)\b[^0-9a-z]{{0,4}}(?:(?:is|by|on|of|for|date|submission|proposals?|applications?|the)\s*[:\-]?\s*){{0,4}}({})",
        date_token_pattern()
    ))
    .expect("deadline phrase regex")
});

static THROUGHOUT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bthroughout\s+the\s+year\b").expect("throughout regex"));

/// Pull a start/end pair out of `text`.
///
/// "throughout the year" short-circuits to a rolling end date with no start.
/// Otherwise every date-like token that normalizes to a real date is collected;
/// two or more distinct dates give (earliest, latest), a single date is only the end.
pub fn extract_date_range(text: &str) -> DateRange {
    if THROUGHOUT_YEAR.is_match(text) {
        return DateRange {
            start: None,
            end: Some(DateValue::Rolling),
        };
    }

    let phrase_tokens = DEADLINE_PHRASE
        .captures_iter(text)
        .filter_map(|c| c.get(1).map(|m| m.as_str()));
    let bare_tokens = DATE_TOKEN.find_iter(text).map(|m| m.as_str());

    let dates: BTreeSet<NaiveDate> = phrase_tokens
        .chain(bare_tokens)
        .filter_map(|tok| normalize_date(tok).and_then(|d| d.as_date()))
        .collect();

    let first = dates.iter().next().copied();
    let last = dates.iter().next_back().copied();
    match (first, last) {
        (Some(a), Some(b)) if a != b => DateRange {
            start: Some(DateValue::Iso(a)),
            end: Some(DateValue::Iso(b)),
        },
        (_, Some(only)) => DateRange {
            start: None,
            end: Some(DateValue::Iso(only)),
        },
        _ => DateRange::default(),
    }
}
