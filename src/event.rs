//! Canonical event record produced by every ingestion run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analyze::{Centroid, Precision, RiskCategory};
use crate::source_quality::SourceQuality;

pub const TITLE_MAX_CHARS: usize = 500;
pub const SUMMARY_MAX_CHARS: usize = 240;
/// Country list sentinel when no location could be inferred.
pub const GLOBAL_COUNTRY: &str = "GLOBAL";

/// Hex chars of the SHA-256 digest kept as the event id.
const ID_HEX_LEN: usize = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub precision: Precision,
}

impl Location {
    pub fn global() -> Self {
        Self {
            name: "Global".to_string(),
            lat: 0.0,
            lon: 0.0,
            precision: Precision::Global,
        }
    }

    pub fn from_centroid(c: Centroid, precision: Precision) -> Self {
        Self {
            name: c.name,
            lat: c.lat,
            lon: c.lon,
            precision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub why_it_matters: String,
    pub source_url: String,
    pub source_name: String,
    pub source_quality: SourceQuality,
    #[serde(with = "utc_z")]
    pub published_at: DateTime<Utc>,
    pub materials: Vec<String>,
    pub risk_type: Vec<RiskCategory>,
    pub severity: u8,
    pub countries: Vec<String>,
    pub location: Location,
    pub tags: Vec<String>,
}

impl Event {
    pub fn published_at_z(&self) -> String {
        crate::ingest::normalize::format_utc_z(&self.published_at)
    }
}

/// Stable identity of a document: pure function of `(url, title)`.
pub fn event_id(url: &str, title: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(b"|");
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(ID_HEX_LEN + 1);
    for b in digest.iter().take(ID_HEX_LEN.div_ceil(2)) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out.truncate(ID_HEX_LEN);
    out
}

/// Sorted, deduplicated union of uppercased categories plus the material tag.
pub fn build_tags(categories: &[RiskCategory], material: &str) -> Vec<String> {
    let mut tags: Vec<String> = categories
        .iter()
        .map(|c| c.as_str().to_uppercase())
        .chain(std::iter::once(material.to_uppercase()))
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Serde adapter rendering timestamps as `YYYY-MM-DDTHH:MM:SSZ` (fraction only when present).
pub mod utc_z {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::ingest::normalize::format_utc_z(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_is_deterministic_and_short() {
        let a = event_id("https://x.test/a", "Title");
        let b = event_id("https://x.test/a", "Title");
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_HEX_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, event_id("https://x.test/a", "Title!"));
        assert_ne!(a, event_id("https://x.test/b", "Title"));
    }

    #[test]
    fn id_separator_prevents_concat_collisions() {
        assert_ne!(event_id("ab", "c"), event_id("a", "bc"));
    }

    #[test]
    fn tags_are_sorted_and_unique() {
        let tags = build_tags(
            &[RiskCategory::Sanctions, RiskCategory::Labor, RiskCategory::Labor],
            "Copper",
        );
        assert_eq!(tags, vec!["COPPER", "LABOR", "SANCTIONS"]);
    }

    #[test]
    fn serializes_with_camel_case_and_z_suffix() {
        let ev = Event {
            id: "abc".into(),
            title: "t".into(),
            summary: "s".into(),
            why_it_matters: "w".into(),
            source_url: "https://x.test".into(),
            source_name: "X".into(),
            source_quality: SourceQuality::MajorMedia,
            published_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap(),
            materials: vec!["Copper".into()],
            risk_type: vec![RiskCategory::Other],
            severity: 25,
            countries: vec![GLOBAL_COUNTRY.into()],
            location: Location::global(),
            tags: vec!["COPPER".into(), "OTHER".into()],
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["publishedAt"], "2024-03-05T14:30:00Z");
        assert_eq!(v["sourceQuality"], "MAJOR_MEDIA");
        assert_eq!(v["riskType"][0], "other");
        assert_eq!(v["location"]["precision"], "global");
        assert!(v.get("whyItMatters").is_some());

        let back: Event = serde_json::from_value(v).unwrap();
        assert_eq!(back, ev);
    }
}
