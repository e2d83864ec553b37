//! # Source Quality
//!
//! Maps the domain of a document URL to a coarse provenance label
//! (`OFFICIAL`, `MAJOR_MEDIA`, `INDUSTRY`, `OTHER`) and decides whether a
//! document should be dropped as spam.
//!
//! - Domains are compared lowercased, exactly (no suffix matching).
//! - Unknown domains are `OTHER`.
//! - The blocklist only applies to `OTHER` domains: allowlist membership
//!   always wins over the blocklist.
//! - Includes a built-in `default_seed()` used when no config overrides it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Provenance label attached to every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceQuality {
    Official,
    MajorMedia,
    Industry,
    Other,
}

impl SourceQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceQuality::Official => "OFFICIAL",
            SourceQuality::MajorMedia => "MAJOR_MEDIA",
            SourceQuality::Industry => "INDUSTRY",
            SourceQuality::Other => "OTHER",
        }
    }
}

impl fmt::Display for SourceQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownQuality(pub String);

impl fmt::Display for UnknownQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source quality label: {}", self.0)
    }
}

impl std::error::Error for UnknownQuality {}

impl FromStr for SourceQuality {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFFICIAL" => Ok(SourceQuality::Official),
            "MAJOR_MEDIA" => Ok(SourceQuality::MajorMedia),
            "INDUSTRY" => Ok(SourceQuality::Industry),
            "OTHER" => Ok(SourceQuality::Other),
            other => Err(UnknownQuality(other.to_string())),
        }
    }
}

/// Domain allowlist (domain → quality) plus spam blocklist.
/// Omitted tables fall back to the built-in seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceQualityConfig {
    pub allowlist: BTreeMap<String, SourceQuality>,
    pub blocklist: BTreeSet<String>,
}

impl Default for SourceQualityConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceQualityConfig {
    /// Quality label for the domain of `url`.
    pub fn quality_for_url(&self, url: &str) -> SourceQuality {
        let d = domain_of(url);
        if d.is_empty() {
            return SourceQuality::Other;
        }
        self.allowlist
            .get(&d)
            .copied()
            .unwrap_or(SourceQuality::Other)
    }

    /// Best-effort spam filter. Only drops when the domain is untrusted (`OTHER`)
    /// and listed on the blocklist.
    pub fn should_drop(&self, url: &str) -> bool {
        let d = domain_of(url);
        self.quality_for_url(url) == SourceQuality::Other && self.blocklist.contains(&d)
    }

    /// Lowercase every key so lookups stay exact after user edits.
    pub fn normalized(self) -> Self {
        Self {
            allowlist: self
                .allowlist
                .into_iter()
                .map(|(k, v)| (k.trim().to_ascii_lowercase(), v))
                .filter(|(k, _)| !k.is_empty())
                .collect(),
            blocklist: self
                .blocklist
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Built-in reference tables.
    pub fn default_seed() -> Self {
        let mut allowlist = BTreeMap::new();
        for (d, q) in [
            ("home.treasury.gov", SourceQuality::Official),
            ("ofac.treasury.gov", SourceQuality::Official),
            ("state.gov", SourceQuality::Official),
            ("www.state.gov", SourceQuality::Official),
            ("mining.com", SourceQuality::Industry),
            ("www.mining.com", SourceQuality::Industry),
            ("reuters.com", SourceQuality::MajorMedia),
            ("www.reuters.com", SourceQuality::MajorMedia),
        ] {
            allowlist.insert(d.to_string(), q);
        }

        let blocklist = ["insidermonkey.com", "tickerreport.com", "themarketsdaily.com"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            allowlist,
            blocklist,
        }
    }
}

/// Lowercased host of an absolute http(s) URL, or `""` when there is none.
pub fn domain_of(url: &str) -> String {
    match url::Url::parse(url.trim()) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => u
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
