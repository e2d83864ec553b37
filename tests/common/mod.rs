// tests/common/mod.rs
// Shared helpers: local upstream servers, fixtures and a fast-retry fetcher.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, TimeZone, Utc};

use geo_monitor::ingest::builder::EventBuilder;
use geo_monitor::ingest::fetch::{FetchPolicy, ResilientFetcher};
use geo_monitor::ingest::types::IngestContext;

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

/// A local port nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    addr
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read fixture {path}: {e}"))
}

/// Millisecond backoff so retry paths stay fast.
pub fn fast_policy(max_retries: u32) -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        max_retries,
        backoff_base: Duration::from_millis(5),
        backoff_max: Duration::from_millis(20),
    }
}

pub fn fast_fetcher(max_retries: u32) -> ResilientFetcher {
    ResilientFetcher::new(fast_policy(max_retries)).expect("http client")
}

pub fn ingested_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap()
}

pub fn ctx(days: u32) -> IngestContext {
    IngestContext {
        days,
        builder: EventBuilder::with_defaults(ingested_at()),
    }
}
