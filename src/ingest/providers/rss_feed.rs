// src/ingest/providers/rss_feed.rs
//! RSS 2.0 adapters: Mining.com (single feed) and State Dept (configured list).

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::{info, warn};

use crate::event::Event;
use crate::ingest::fetch::ResilientFetcher;
use crate::ingest::types::{IngestContext, RawDocument, SourceError, SourceOutcome, SourceProvider};

pub const MINING_COM_FEED: &str = "https://www.mining.com/feed/";

const RSS_ACCEPT: &str = "application/rss+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// What a failing feed does to the whole adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFailure {
    /// Propagate to the orchestrator (single authoritative feed).
    Propagate,
    /// Log and move on to the next feed.
    Skip,
}

pub struct RssFeedProvider {
    name: String,
    source_name: String,
    feeds: Vec<String>,
    max_items: usize,
    on_failure: FeedFailure,
    fetcher: ResilientFetcher,
}

impl RssFeedProvider {
    pub fn mining_com(fetcher: ResilientFetcher) -> Self {
        Self {
            name: "Mining.com RSS".to_string(),
            source_name: "Mining.com".to_string(),
            feeds: vec![MINING_COM_FEED.to_string()],
            max_items: 200,
            on_failure: FeedFailure::Propagate,
            fetcher,
        }
    }

    /// No feeds configured → the adapter reports `empty`.
    pub fn state_dept(fetcher: ResilientFetcher, feeds: Vec<String>) -> Self {
        Self {
            name: "State Dept RSS".to_string(),
            source_name: "U.S. State Dept".to_string(),
            feeds,
            max_items: 80,
            on_failure: FeedFailure::Skip,
            fetcher,
        }
    }

    pub fn with_feeds(mut self, feeds: Vec<String>) -> Self {
        self.feeds = feeds;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn feeds(&self) -> &[String] {
        &self.feeds
    }

    async fn collect_feed(
        &self,
        feed_url: &str,
        ctx: &IngestContext,
    ) -> Result<Vec<Event>, SourceError> {
        let page = self
            .fetcher
            .get(feed_url, &[], &[("Accept", RSS_ACCEPT)])
            .await?
            .into_page()?;

        let docs = match parse_feed(&page.text(), &self.source_name) {
            Ok(docs) => docs,
            Err(e) => {
                warn!(source = %self.name, feed = feed_url, error = %e, "rss parse error; skipping feed");
                return Ok(Vec::new());
            }
        };
        if docs.is_empty() {
            info!(source = %self.name, feed = feed_url, "feed returned 0 entries");
        }

        Ok(docs
            .into_iter()
            .take(self.max_items)
            .filter_map(|d| ctx.builder.build(d))
            .collect())
    }

    async fn try_collect(&self, ctx: &IngestContext) -> Result<Vec<Event>, SourceError> {
        if self.feeds.is_empty() {
            info!(source = %self.name, "no feeds configured; skipping");
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut blocked = None;
        let mut succeeded = 0usize;
        for feed_url in &self.feeds {
            match self.collect_feed(feed_url, ctx).await {
                Ok(events) => {
                    succeeded += 1;
                    out.extend(events);
                }
                Err(e) if self.on_failure == FeedFailure::Propagate => return Err(e),
                Err(SourceError::Blocked(b)) => {
                    warn!(source = %self.name, feed = %feed_url, reason = %b, "feed blocked; skipping");
                    blocked = Some(b);
                }
                Err(e) => {
                    warn!(source = %self.name, feed = %feed_url, error = %e, "feed failed; skipping");
                }
            }
        }

        // Every feed refused us: surface the block instead of a silent `empty`.
        match blocked {
            Some(b) if succeeded == 0 && out.is_empty() => Err(SourceError::Blocked(b)),
            _ => Ok(out),
        }
    }
}

/// Decode an RSS 2.0 document into candidate documents (entries without a
/// title or link are dropped).
pub fn parse_feed(xml: &str, source_name: &str) -> Result<Vec<RawDocument>, quick_xml::DeError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean)?;

    Ok(rss
        .channel
        .items
        .into_iter()
        .filter_map(|it| {
            let title = it.title.unwrap_or_default();
            let url = it.link.map(|l| l.trim().to_string()).unwrap_or_default();
            if title.trim().is_empty() || url.is_empty() {
                return None;
            }
            Some(RawDocument {
                title,
                summary: it.description.unwrap_or_default(),
                url,
                source_name: source_name.to_string(),
                published_raw: it.pub_date,
                location: None,
                force_include: false,
            })
        })
        .collect())
}

/// XML knows only five named entities; feeds routinely carry HTML ones.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[async_trait]
impl SourceProvider for RssFeedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, ctx: &IngestContext) -> SourceOutcome {
        self.try_collect(ctx).await.into()
    }
}
