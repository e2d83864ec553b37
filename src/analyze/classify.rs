//! Topical classifier: commodity relevance, risk taxonomy and severity.
//!
//! Deterministic keyword engine over lowercased text. Every table is an
//! ordered list and the order is part of the contract:
//! - risk categories are emitted in declaration order,
//! - severity tiers are evaluated severe → moderate → mild, first hit wins,
//! - the explanation is keyed by the first category.
//!
//! Matching is plain substring containment, so `"ban"` also hits `"urban"`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commodity keywords for copper. Note the trailing space in `"cu "`.
pub const COPPER_KEYWORDS: &[&str] = &[
    "copper", "codelco", "smelter", "smelting", "refining", "refinery", "concentrate",
    "cathode", "mine", "mining", "tcrc", "cu ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Policy,
    Logistics,
    Labor,
    Conflict,
    Sanctions,
    Other,
}

/// Keyword table in emission order. `Other` is the catch-all and has no keywords.
pub const RISK_RULES: &[(RiskCategory, &[&str])] = &[
    (
        RiskCategory::Policy,
        &[
            "regulation", "law", "policy", "ban", "export control", "license", "royalty", "tax",
            "tariff", "quota",
        ],
    ),
    (
        RiskCategory::Logistics,
        &[
            "shipping", "port", "canal", "transport", "delay", "rail", "road", "freight",
            "blockade", "strait",
        ],
    ),
    (
        RiskCategory::Labor,
        &["strike", "protest", "union", "wage", "worker", "labor"],
    ),
    (
        RiskCategory::Conflict,
        &["war", "conflict", "attack", "military", "missile", "invasion"],
    ),
    (
        RiskCategory::Sanctions,
        &["sanction", "embargo", "restriction", "designation", "sdn"],
    ),
];

pub const SEVERITY_BASE: i32 = 25;

/// Mutually exclusive keyword tiers, highest first. Only the first matching tier counts.
pub const SEVERITY_TIERS: &[(i32, &[&str])] = &[
    (40, &["shutdown", "collapse", "ban", "embargo"]),
    (25, &["strike", "blockade", "attack", "sanction", "halt"]),
    (10, &["delay", "protest", "tighten", "restriction"]),
];

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Policy => "policy",
            RiskCategory::Logistics => "logistics",
            RiskCategory::Labor => "labor",
            RiskCategory::Conflict => "conflict",
            RiskCategory::Sanctions => "sanctions",
            RiskCategory::Other => "other",
        }
    }

    /// Fixed "why it matters" sentence for this category.
    pub fn explanation(&self) -> &'static str {
        match self {
            RiskCategory::Policy => "Potential policy/regulatory change that can affect permitting, exports, taxes, or investment conditions.",
            RiskCategory::Logistics => "Potential disruption to transport/ports/shipping that can delay concentrates/cathodes and tighten supply.",
            RiskCategory::Labor => "Labor action risk (strike/protest) that can reduce mine/smelter throughput and impact TCRCs/availability.",
            RiskCategory::Conflict => "Conflict/security risk that can disrupt operations, infrastructure, or trade routes.",
            RiskCategory::Sanctions => "Sanctions/designations risk that can affect counterparties, payments, shipping, and trade compliance.",
            RiskCategory::Other => "Potential market-moving development; verify details and linkage to the copper supply chain.",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relevance gate for one monitored commodity.
#[derive(Debug, Clone)]
pub struct Classifier {
    material: String,
    keywords: Vec<String>,
}

impl Classifier {
    pub fn new(material: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            material: material.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn copper() -> Self {
        Self::new("Copper", COPPER_KEYWORDS)
    }

    /// Display name of the monitored commodity (e.g. `Copper`).
    pub fn material(&self) -> &str {
        &self.material
    }

    /// True if any commodity keyword occurs in `text` (case-insensitive).
    pub fn is_relevant(&self, text: &str) -> bool {
        let t = text.to_lowercase();
        self.keywords.iter().any(|k| t.contains(k.as_str()))
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::copper()
    }
}

/// Risk categories hit by `text`, in declaration order; never empty.
pub fn risk_categories(text: &str) -> Vec<RiskCategory> {
    let t = text.to_lowercase();
    let out: Vec<RiskCategory> = RISK_RULES
        .iter()
        .filter(|(_, kws)| kws.iter().any(|kw| t.contains(kw)))
        .map(|(cat, _)| *cat)
        .collect();
    if out.is_empty() {
        vec![RiskCategory::Other]
    } else {
        out
    }
}

/// True when the only category is the catch-all.
pub fn is_uncategorized(categories: &[RiskCategory]) -> bool {
    categories.iter().all(|c| *c == RiskCategory::Other)
}

/// Heuristic severity in [0, 100]: base, one tier bonus, then category modifiers.
pub fn severity(text: &str, categories: &[RiskCategory]) -> u8 {
    let t = text.to_lowercase();
    let mut score = SEVERITY_BASE;

    if let Some((bonus, _)) = SEVERITY_TIERS
        .iter()
        .find(|(_, kws)| kws.iter().any(|kw| t.contains(kw)))
    {
        score += bonus;
    }

    let has = |c: RiskCategory| categories.contains(&c);
    if has(RiskCategory::Sanctions) || has(RiskCategory::Conflict) {
        score += 10;
    }
    if has(RiskCategory::Policy) {
        score += 5;
    }
    if has(RiskCategory::Logistics) {
        score += 5;
    }

    score.clamp(0, 100) as u8
}

/// Explanation keyed by the first category (or `other`).
pub fn explanation(categories: &[RiskCategory]) -> &'static str {
    categories
        .first()
        .copied()
        .unwrap_or(RiskCategory::Other)
        .explanation()
}
