// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /ingest/run  (report shape, persistence)
// - GET /events       (default quality filter, ALL, pagination, 422s)

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use geo_monitor::ingest::types::{IngestContext, RawDocument, SourceOutcome, SourceProvider};
use geo_monitor::source_quality::SourceQualityConfig;
use geo_monitor::{create_router, AppState, EventStore, Pipeline};

const BODY_LIMIT: usize = 1024 * 1024;

struct FixedDocs(Vec<RawDocument>);

#[async_trait]
impl SourceProvider for FixedDocs {
    fn name(&self) -> &str {
        "Fixed"
    }

    async fn collect(&self, ctx: &IngestContext) -> SourceOutcome {
        SourceOutcome::Collected(
            self.0
                .iter()
                .cloned()
                .filter_map(|d| ctx.builder.build(d))
                .collect(),
        )
    }
}

struct AlwaysBlocked;

#[async_trait]
impl SourceProvider for AlwaysBlocked {
    fn name(&self) -> &str {
        "Blocked"
    }

    async fn collect(&self, _ctx: &IngestContext) -> SourceOutcome {
        SourceOutcome::Blocked("blocked by upstream (HTTP 403) at https://blocked.test".into())
    }
}

fn docs() -> Vec<RawDocument> {
    // No dates: every event lands just before ingestion time, inside any window.
    vec![
        RawDocument {
            title: "Treasury sanctions copper smuggling ring".into(),
            url: "https://home.treasury.gov/news/press-releases/jy1".into(),
            source_name: "U.S. Treasury".into(),
            ..Default::default()
        },
        RawDocument {
            title: "Codelco halts shipments amid port strike".into(),
            url: "https://www.mining.com/codelco/".into(),
            source_name: "Mining.com".into(),
            ..Default::default()
        },
        RawDocument {
            title: "Copper miners rally on blog hype".into(),
            url: "https://copper-blog.example/hype".into(),
            source_name: "Blog".into(),
            ..Default::default()
        },
    ]
}

/// Build the same Router the binary uses, over a temp SQLite file.
async fn test_router() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("api.db").display());
    let store = EventStore::new(&url).expect("store");
    store.init().await.expect("init");

    let providers: Vec<Box<dyn SourceProvider>> =
        vec![Box::new(FixedDocs(docs())), Box::new(AlwaysBlocked)];
    let pipeline = Pipeline::new(providers, SourceQualityConfig::default_seed());
    (dir, create_router(AppState::new(pipeline, store, 7)))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let (_dir, app) = test_router().await;
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn ingest_run_reports_sources_and_persists() {
    let (_dir, app) = test_router().await;

    let (status, body) = send(&app, "POST", "/ingest/run?days=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["events_ingested"], 3);

    let sources = body["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["source"], "Fixed");
    assert_eq!(sources[0]["status"], "ok");
    assert_eq!(sources[0]["events"], 3);
    assert_eq!(sources[1]["status"], "blocked");
    assert!(sources[1]["error"].as_str().unwrap().contains("403"));
    assert!(sources[1].get("durationMs").is_some());

    // default quality filter hides the OTHER-quality blog
    let (status, body) = send(&app, "GET", "/events").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["filters_applied"]["quality"], "OFFICIAL,MAJOR_MEDIA,INDUSTRY");
    assert_eq!(body["filters_applied"]["material"], "copper");

    let (_, body) = send(&app, "GET", "/events?quality=ALL").await;
    assert_eq!(body["count"], 3);

    let (_, body) = send(&app, "GET", "/events?quality=ALL&risk=labor").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["events"][0]["title"], "Codelco halts shipments amid port strike");
    assert_eq!(body["events"][0]["location"]["precision"], "entity");

    // re-running is idempotent for the store
    let (status, _) = send(&app, "POST", "/ingest/run").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/events?quality=ALL").await;
    assert_eq!(body["count"], 3);
}

#[tokio::test]
async fn events_pagination_reaches_every_undated_event() {
    let (_dir, app) = test_router().await;
    send(&app, "POST", "/ingest/run").await;

    let mut uri = "/events?quality=ALL&limit=1".to_string();
    let mut titles = Vec::new();
    loop {
        let (status, body) = send(&app, "GET", &uri).await;
        assert_eq!(status, StatusCode::OK);
        if body["count"] == 0 {
            assert!(body["nextCursor"].is_null());
            break;
        }
        assert_eq!(body["count"], 1);
        titles.push(body["events"][0]["title"].as_str().unwrap().to_string());
        let cursor = body["nextCursor"].as_str().expect("cursor");
        assert!(cursor.ends_with('Z'));
        uri = format!("/events?quality=ALL&limit=1&cursor={cursor}");
    }

    // all three are undated; build order is newest first
    assert_eq!(
        titles,
        vec![
            "Treasury sanctions copper smuggling ring",
            "Codelco halts shipments amid port strike",
            "Copper miners rally on blog hype",
        ]
    );
}

#[tokio::test]
async fn out_of_range_params_are_422() {
    let (_dir, app) = test_router().await;
    for uri in [
        "/events?days=0",
        "/events?days=31",
        "/events?limit=0",
        "/events?limit=501",
        "/events?cursor=yesterday",
        "/events?quality=PREMIUM",
        "/ingest/run?days=40",
    ] {
        let method = if uri.starts_with("/ingest") { "POST" } else { "GET" };
        let (status, body) = send(&app, method, uri).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        assert!(body["error"].is_string(), "{uri}");
    }
}
