// src/ingest/providers/mod.rs
pub mod gdelt;
pub mod html_list;
pub mod rss_feed;

pub use gdelt::GdeltProvider;
pub use html_list::HtmlListProvider;
pub use rss_feed::RssFeedProvider;

use crate::config::IngestConfig;
use crate::ingest::fetch::ResilientFetcher;
use crate::ingest::types::SourceProvider;

/// Production adapter set in declaration order. Later entries win on id collisions.
pub fn default_providers(
    cfg: &IngestConfig,
    fetcher: &ResilientFetcher,
) -> Vec<Box<dyn SourceProvider>> {
    let mut mining = RssFeedProvider::mining_com(fetcher.clone());
    let mut treasury = HtmlListProvider::treasury_press_releases(fetcher.clone());
    let mut ofac = HtmlListProvider::ofac_recent_actions(fetcher.clone());
    let mut state = RssFeedProvider::state_dept(fetcher.clone(), cfg.state_dept_feeds.clone());
    if let Some(cap) = cfg.max_items_per_source {
        mining = mining.with_max_items(cap);
        treasury = treasury.with_max_events(cap);
        ofac = ofac.with_max_events(cap);
        state = state.with_max_items(cap);
    }

    vec![
        Box::new(GdeltProvider::new(fetcher.clone()).with_max_records(cfg.gdelt_max_records)),
        Box::new(mining),
        Box::new(treasury),
        Box::new(ofac),
        Box::new(state),
    ]
}
