// src/ingest/builder.rs
//! Composes normalizer, classifier and geo resolver output into one `Event`.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::analyze::classify::{self, Classifier};
use crate::analyze::geo::GeoResolver;
use crate::event::{
    build_tags, event_id, Event, Location, GLOBAL_COUNTRY, SUMMARY_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::ingest::normalize::{normalize_document, parse_source_date, truncate_chars, whole_micros};
use crate::ingest::types::RawDocument;
use crate::source_quality::SourceQualityConfig;

#[derive(Debug, Clone)]
pub struct EventBuilder {
    quality: Arc<SourceQualityConfig>,
    geo: Arc<GeoResolver>,
    classifier: Arc<Classifier>,
    ingested_at: DateTime<Utc>,
    undated: Arc<AtomicI64>,
}

impl EventBuilder {
    pub fn new(
        quality: Arc<SourceQualityConfig>,
        geo: Arc<GeoResolver>,
        classifier: Arc<Classifier>,
        ingested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            quality,
            geo,
            classifier,
            ingested_at: whole_micros(ingested_at),
            undated: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Builder over the built-in reference tables.
    pub fn with_defaults(ingested_at: DateTime<Utc>) -> Self {
        Self::new(
            Arc::new(SourceQualityConfig::default_seed()),
            Arc::new(GeoResolver::builtin()),
            Arc::new(Classifier::copper()),
            ingested_at,
        )
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Fallback timestamp for the first document without a usable date.
    pub fn ingested_at(&self) -> DateTime<Utc> {
        self.ingested_at
    }

    /// Undated documents step back one microsecond each from `ingested_at`,
    /// so every one gets a distinct key in build order.
    fn fallback_timestamp(&self) -> DateTime<Utc> {
        let n = self.undated.fetch_add(1, Ordering::Relaxed);
        self.ingested_at - Duration::microseconds(n)
    }

    /// Normalize, gate, classify and locate one document.
    /// `None` when the document is spam, blank, or off-topic without forced inclusion.
    pub fn build(&self, doc: RawDocument) -> Option<Event> {
        if self.quality.should_drop(&doc.url) {
            debug!(url = %doc.url, "dropped: blocklisted domain");
            return None;
        }

        let text = normalize_document(&doc.title, &doc.summary);
        if text.title.is_empty() {
            return None;
        }
        if !doc.force_include && !self.classifier.is_relevant(&text.combined) {
            return None;
        }

        let risks = classify::risk_categories(&text.combined);
        let severity = classify::severity(&text.combined, &risks);
        let geo = self.geo.resolve(&text.combined);

        let countries = if geo.countries.is_empty() && doc.location.is_none() {
            vec![GLOBAL_COUNTRY.to_string()]
        } else {
            geo.countries
        };
        let location = match (doc.location, geo.centroid) {
            (Some(explicit), _) => explicit,
            (None, Some(c)) => Location::from_centroid(c, geo.precision),
            (None, None) => Location::global(),
        };

        let material = self.classifier.material().to_string();
        let published_at = parse_source_date(doc.published_raw.as_deref())
            .unwrap_or_else(|| self.fallback_timestamp());
        Some(Event {
            id: event_id(&doc.url, &text.title),
            title: truncate_chars(&text.title, TITLE_MAX_CHARS),
            summary: truncate_chars(&text.summary, SUMMARY_MAX_CHARS),
            why_it_matters: classify::explanation(&risks).to_string(),
            source_quality: self.quality.quality_for_url(&doc.url),
            source_url: doc.url,
            source_name: doc.source_name,
            published_at,
            tags: build_tags(&risks, &material),
            materials: vec![material],
            risk_type: risks,
            severity,
            countries,
            location,
        })
    }
}
