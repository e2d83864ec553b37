// src/ingest/providers/gdelt.rs
//! GDELT 2.1 DOC API (`mode=ArtList`) discovery adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::event::Event;
use crate::ingest::fetch::ResilientFetcher;
use crate::ingest::types::{IngestContext, RawDocument, SourceError, SourceOutcome, SourceProvider};

pub const GDELT_DOC_API: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

/// Copper is mandatory so results are not diluted by generic mining news.
const QUERY_TERMS: &str = "mine OR mining OR smelter OR refinery OR concentrate OR cathode OR \
export OR import OR tariff OR quota OR strike OR protest OR \
sanction OR embargo OR port OR shipping OR canal OR blockade OR \
royalty OR regulation OR law";

#[derive(Debug, Deserialize)]
struct ArtList {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    seendate: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

pub struct GdeltProvider {
    name: String,
    endpoint: String,
    domain: Option<String>,
    source_label: Option<String>,
    max_records: u32,
    fetcher: ResilientFetcher,
}

impl GdeltProvider {
    pub fn new(fetcher: ResilientFetcher) -> Self {
        Self {
            name: "GDELT".to_string(),
            endpoint: GDELT_DOC_API.to_string(),
            domain: None,
            source_label: None,
            max_records: 100,
            fetcher,
        }
    }

    /// Restrict the query to one publisher domain and label its events.
    pub fn restricted_to_domain(mut self, domain: &str, source_label: &str) -> Self {
        self.name = format!("{source_label} via GDELT");
        self.domain = Some(domain.to_string());
        self.source_label = Some(source_label.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_records(mut self, max_records: u32) -> Self {
        self.max_records = max_records.clamp(1, 250);
        self
    }

    pub fn query(&self) -> String {
        match &self.domain {
            Some(d) => format!("domain:{d} AND copper AND ({QUERY_TERMS})"),
            None => format!("copper AND ({QUERY_TERMS})"),
        }
    }

    async fn try_collect(&self, ctx: &IngestContext) -> Result<Vec<Event>, SourceError> {
        let params = [
            ("query", self.query()),
            ("mode", "ArtList".to_string()),
            ("format", "json".to_string()),
            ("maxrecords", self.max_records.to_string()),
            ("timespan", format!("{}d", ctx.days.max(1))),
            ("sort", "DateDesc".to_string()),
        ];
        let page = self
            .fetcher
            .get(&self.endpoint, &params, &[("Accept", "application/json")])
            .await?
            .into_page()?;

        let docs = match parse_artlist(&page.text(), &self.name, self.source_label.as_deref()) {
            Ok(docs) => docs,
            Err(e @ SourceError::Malformed { .. }) => {
                warn!(source = %self.name, error = %e, "degrading to empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };
        if docs.is_empty() {
            warn!(
                source = %self.name,
                timespan_days = ctx.days,
                "GDELT returned 0 articles for the query/timespan"
            );
        }

        Ok(docs
            .into_iter()
            .take(self.max_records as usize)
            .filter_map(|d| ctx.builder.build(d))
            .collect())
    }
}

/// Decode an ArtList JSON body into candidate documents.
///
/// GDELT answers bad queries with HTTP 200 and either a plain-text message
/// (→ `Malformed`) or `{"status":"error"}` (→ `Upstream`).
pub fn parse_artlist(
    body: &str,
    source_name: &str,
    source_label: Option<&str>,
) -> Result<Vec<RawDocument>, SourceError> {
    let list: ArtList = serde_json::from_str(body).map_err(|e| SourceError::Malformed {
        source_name: source_name.to_string(),
        detail: e.to_string(),
    })?;

    if list.status.as_deref() == Some("error") {
        return Err(SourceError::Upstream {
            source_name: source_name.to_string(),
            message: list
                .message
                .unwrap_or_else(|| "status=error without message".to_string()),
        });
    }

    Ok(list
        .articles
        .into_iter()
        .filter_map(|a| {
            let title = a.title.unwrap_or_default();
            let url = a.url.unwrap_or_default();
            if title.trim().is_empty() || url.trim().is_empty() {
                return None;
            }
            let source_name = source_label
                .map(str::to_string)
                .or(a.domain.filter(|d| !d.trim().is_empty()))
                .unwrap_or_else(|| "GDELT".to_string());
            Some(RawDocument {
                title,
                summary: a.snippet.unwrap_or_default(),
                url,
                source_name,
                published_raw: a.seendate,
                location: None,
                force_include: false,
            })
        })
        .collect())
}

#[async_trait]
impl SourceProvider for GdeltProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, ctx: &IngestContext) -> SourceOutcome {
        self.try_collect(ctx).await.into()
    }
}
