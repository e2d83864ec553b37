// src/ingest/normalize.rs
//! Markup stripping, summary fallback and best-effort timestamp parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

/// Words kept when a summary has to be synthesized from the title.
pub const FALLBACK_SUMMARY_WORDS: usize = 28;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Canonical text triple for one candidate document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub title: String,
    pub summary: String,
    /// `title + " " + summary`, the input of every classifier.
    pub combined: String,
}

/// Strip tag-like markup, decode entities, collapse whitespace, trim.
pub fn clean(raw: &str) -> String {
    // 1) Tags become spaces so adjacent words do not glue together
    let out = RE_TAGS.replace_all(raw, " ");

    // 2) HTML entity decode (&nbsp; → U+00A0, folded below)
    let out = html_escape::decode_html_entities(&out);

    // 3) Collapse whitespace
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Cleaned summary, or the first words of the title when the summary is blank.
pub fn summary_or_fallback(title: &str, summary: &str) -> String {
    let s = clean(summary);
    if !s.is_empty() {
        return s;
    }
    title
        .split_whitespace()
        .take(FALLBACK_SUMMARY_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_document(title: &str, summary: &str) -> NormalizedText {
    let title = clean(title);
    let summary = summary_or_fallback(&title, summary);
    let combined = format!("{title} {summary}");
    NormalizedText {
        title,
        summary,
        combined,
    }
}

/// Truncate to at most `max` chars (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ`; a fraction is rendered only when one is present.
pub fn format_utc_z(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Fixed-width `YYYY-MM-DDTHH:MM:SS.ffffffZ`, so stored keys order as plain strings.
pub fn format_sort_key(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn whole_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(dt.timestamp(), 0).single().unwrap_or(dt)
}

pub fn whole_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_micros(dt.timestamp_micros()).single().unwrap_or(dt)
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y%m%dT%H%M%SZ",
    "%Y%m%d%H%M%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%m/%d/%Y"];

/// Best-effort parse of a source-provided date to UTC, never failing.
/// Missing or unparseable input yields `fallback`.
pub fn parse_published(raw: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    parse_source_date(raw).unwrap_or_else(|| whole_micros(fallback))
}

/// Source date truncated to whole seconds, `None` when absent or unparseable.
pub fn parse_source_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    parse_datetime(raw).map(whole_seconds)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Feeds: RFC 2822
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc2822) {
        if let Some(utc) = Utc.timestamp_opt(dt.unix_timestamp(), 0).single() {
            return Some(utc);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
        }
    }
    None
}
