// src/ingest/providers/html_list.rs
//! Anchor-list scrapers for official listing pages (Treasury, OFAC).

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::event::Event;
use crate::ingest::fetch::ResilientFetcher;
use crate::ingest::normalize::clean;
use crate::ingest::types::{
    Inclusion, IngestContext, RawDocument, SourceError, SourceOutcome, SourceProvider,
};

pub const TREASURY_PRESS_RELEASES: &str = "https://home.treasury.gov/news/press-releases";
pub const OFAC_RECENT_ACTIONS: &str = "https://ofac.treasury.gov/recent-actions";

const MAX_EVENTS: usize = 60;

/// A detail link found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedLink {
    pub url: String,
    pub text: String,
}

pub struct HtmlListProvider {
    name: String,
    source_name: String,
    page_url: String,
    href_marker: String,
    /// Link text must be strictly longer than this (chars).
    min_text_len: usize,
    inclusion: Inclusion,
    /// Fetch failures (other than blocks) degrade to `empty` instead of `error`.
    best_effort: bool,
    max_events: usize,
    fetcher: ResilientFetcher,
}

impl HtmlListProvider {
    pub fn treasury_press_releases(fetcher: ResilientFetcher) -> Self {
        Self {
            name: "Treasury PR".to_string(),
            source_name: "U.S. Treasury".to_string(),
            page_url: TREASURY_PRESS_RELEASES.to_string(),
            href_marker: "/news/press-releases/".to_string(),
            min_text_len: 15,
            inclusion: Inclusion::ForcedWhenRisky,
            best_effort: false,
            max_events: MAX_EVENTS,
            fetcher,
        }
    }

    /// OFAC is slow at times; it gets a tighter timeout and never errors the run.
    pub fn ofac_recent_actions(fetcher: ResilientFetcher) -> Self {
        Self {
            name: "OFAC Recent Actions".to_string(),
            source_name: "OFAC".to_string(),
            page_url: OFAC_RECENT_ACTIONS.to_string(),
            href_marker: "/recent-actions/".to_string(),
            min_text_len: 12,
            inclusion: Inclusion::Forced,
            best_effort: true,
            max_events: MAX_EVENTS,
            fetcher: fetcher.with_timeout(Duration::from_secs(15)),
        }
    }

    /// Point the scraper at another listing page (mirrors, local fixtures).
    pub fn with_page_url(mut self, page_url: impl Into<String>) -> Self {
        self.page_url = page_url.into();
        self
    }

    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    async fn try_collect(&self, ctx: &IngestContext) -> Result<Vec<Event>, SourceError> {
        let fetched = match self.fetcher.get(&self.page_url, &[], &[]).await {
            Ok(f) => f,
            Err(e) if self.best_effort => {
                warn!(source = %self.name, error = %e, "skipped due to request error");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let page = fetched.into_page()?;

        let base = Url::parse(&page.url)
            .or_else(|_| Url::parse(&self.page_url))
            .map_err(|e| SourceError::Malformed {
                source_name: self.name.clone(),
                detail: format!("page url: {e}"),
            })?;

        let links = extract_links(&page.text(), &base, &self.href_marker, self.min_text_len);
        if links.is_empty() {
            info!(source = %self.name, "no detail links found on listing page");
        }

        let classifier = ctx.builder.classifier();
        Ok(links
            .into_iter()
            .filter_map(|link| {
                let force_include = self.inclusion.force_include(&link.text, classifier);
                ctx.builder.build(RawDocument {
                    title: link.text,
                    summary: String::new(),
                    url: link.url,
                    source_name: self.source_name.clone(),
                    // listing pages carry no machine-readable dates
                    published_raw: None,
                    location: None,
                    force_include,
                })
            })
            .take(self.max_events)
            .collect())
    }
}

/// Anchors whose `href` contains `marker` and whose visible text is longer
/// than `min_text_len` chars. Relative hrefs are resolved against `base`;
/// duplicates (same url and text) are kept once, in page order.
pub fn extract_links(html: &str, base: &Url, marker: &str, min_text_len: usize) -> Vec<ListedLink> {
    let document = Html::parse_document(html);
    let link_selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return vec![],
    };

    let mut seen = HashSet::new();
    document
        .select(&link_selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            if !href.contains(marker) {
                return None;
            }
            let text = clean(&el.text().collect::<Vec<_>>().join(" "));
            if text.chars().count() <= min_text_len {
                return None;
            }
            let url = base.join(href).ok()?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return None;
            }
            Some(ListedLink {
                url: url.to_string(),
                text,
            })
        })
        .filter(|l| seen.insert((l.url.clone(), l.text.clone())))
        .collect()
}

#[async_trait]
impl SourceProvider for HtmlListProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&self, ctx: &IngestContext) -> SourceOutcome {
        self.try_collect(ctx).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <nav><a href="/news/press-releases">Press Releases</a></nav>
  <div class="views-row">
    <a href="/news/press-releases/jy2101">Treasury Sanctions Network Smuggling <em>Copper</em> Concentrate</a>
  </div>
  <div class="views-row">
    <a href="https://home.treasury.gov/news/press-releases/jy2102">Short one</a>
  </div>
  <div class="views-row">
    <a href="/news/press-releases/jy2101">Treasury Sanctions Network Smuggling Copper Concentrate</a>
  </div>
  <a href="mailto:press@treasury.gov/news/press-releases/x">Email the press office please</a>
</body></html>"#;

    #[test]
    fn keeps_detail_links_with_long_text() {
        let base = Url::parse(TREASURY_PRESS_RELEASES).unwrap();
        let links = extract_links(PAGE, &base, "/news/press-releases/", 15);
        assert_eq!(links.len(), 1);
        assert_eq!(
            links[0].url,
            "https://home.treasury.gov/news/press-releases/jy2101"
        );
        assert_eq!(
            links[0].text,
            "Treasury Sanctions Network Smuggling Copper Concentrate"
        );
    }

    #[test]
    fn text_length_boundary_is_exclusive() {
        let base = Url::parse(OFAC_RECENT_ACTIONS).unwrap();
        let html = r#"<a href="/recent-actions/1">exactly12chr</a><a href="/recent-actions/2">thirteen char</a>"#;
        let links = extract_links(html, &base, "/recent-actions/", 12);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://ofac.treasury.gov/recent-actions/2");
    }

    #[test]
    fn ofac_has_tighter_timeout() {
        let f = ResilientFetcher::new(Default::default()).unwrap();
        let p = HtmlListProvider::ofac_recent_actions(f);
        assert_eq!(p.fetcher.policy().timeout, Duration::from_secs(15));
        assert_eq!(p.name(), "OFAC Recent Actions");
    }
}
