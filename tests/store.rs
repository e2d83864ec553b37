// tests/store.rs
//
// SQLite event store on a temp file: idempotent upserts, window/cursor
// pagination and filters applied before the limit.

use chrono::{DateTime, Duration, TimeZone, Utc};

use geo_monitor::analyze::RiskCategory;
use geo_monitor::event::{Event, Location};
use geo_monitor::ingest::builder::EventBuilder;
use geo_monitor::ingest::types::RawDocument;
use geo_monitor::source_quality::SourceQuality;
use geo_monitor::store::{EventQuery, EventStore};

fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

fn ev(id: &str, at: DateTime<Utc>, quality: SourceQuality, risk: RiskCategory) -> Event {
    Event {
        id: id.into(),
        title: format!("Copper story {id}"),
        summary: "summary".into(),
        why_it_matters: risk.explanation().into(),
        source_url: format!("https://x.test/{id}"),
        source_name: "X".into(),
        source_quality: quality,
        published_at: at,
        materials: vec!["Copper".into()],
        risk_type: vec![risk],
        severity: 40,
        countries: vec!["GLOBAL".into()],
        location: Location::global(),
        tags: vec!["COPPER".into()],
    }
}

async fn temp_store() -> (tempfile::TempDir, EventStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("events.db").display());
    let store = EventStore::new(&url).expect("store");
    store.init().await.expect("init");
    // schema creation is idempotent
    store.init().await.expect("init twice");
    (dir, store)
}

fn since_epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).unwrap()
}

#[tokio::test]
async fn upsert_is_idempotent_and_replaces_by_id() {
    let (_dir, store) = temp_store().await;
    let events = vec![
        ev("a", ts(1, 0), SourceQuality::Official, RiskCategory::Sanctions),
        ev("b", ts(2, 0), SourceQuality::Industry, RiskCategory::Labor),
    ];

    store.upsert_events(&events).await.unwrap();
    let first = store
        .query_events(&EventQuery::new("copper", since_epoch()))
        .await
        .unwrap();
    store.upsert_events(&events).await.unwrap();
    let second = store
        .query_events(&EventQuery::new("copper", since_epoch()))
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(first.events, second.events);

    let mut changed = events[0].clone();
    changed.title = "Copper story a (updated)".into();
    store.upsert_events(&[changed]).await.unwrap();
    let page = store
        .query_events(&EventQuery::new("copper", since_epoch()))
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
    assert!(page.events.iter().any(|e| e.title == "Copper story a (updated)"));
}

#[tokio::test]
async fn cursor_returns_strictly_older_events_newest_first() {
    let (_dir, store) = temp_store().await;
    let events: Vec<Event> = (1..=5)
        .map(|d| ev(&format!("e{d}"), ts(d, 12), SourceQuality::Official, RiskCategory::Policy))
        .collect();
    store.upsert_events(&events).await.unwrap();

    let mut q = EventQuery::new("Copper", since_epoch());
    q.limit = 2;
    let p1 = store.query_events(&q).await.unwrap();
    let ids: Vec<&str> = p1.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e5", "e4"]);
    assert_eq!(p1.next_cursor, Some(ts(4, 12)));

    q.cursor = p1.next_cursor;
    let p2 = store.query_events(&q).await.unwrap();
    let ids: Vec<&str> = p2.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e3", "e2"]);

    q.cursor = Some(ts(1, 12));
    let last = store.query_events(&q).await.unwrap();
    assert!(last.events.is_empty());
    assert_eq!(last.next_cursor, None);
}

#[tokio::test]
async fn since_bounds_the_window() {
    let (_dir, store) = temp_store().await;
    store
        .upsert_events(&[
            ev("old", ts(1, 0), SourceQuality::Official, RiskCategory::Policy),
            ev("new", ts(10, 0), SourceQuality::Official, RiskCategory::Policy),
        ])
        .await
        .unwrap();

    let page = store
        .query_events(&EventQuery::new("copper", ts(10, 0) - Duration::days(2)))
        .await
        .unwrap();
    assert_eq!(page.events.len(), 1);
    assert_eq!(page.events[0].id, "new");
}

#[tokio::test]
async fn filters_apply_before_limit() {
    let (_dir, store) = temp_store().await;
    store
        .upsert_events(&[
            ev("spam1", ts(9, 0), SourceQuality::Other, RiskCategory::Other),
            ev("spam2", ts(8, 0), SourceQuality::Other, RiskCategory::Other),
            ev("gov", ts(7, 0), SourceQuality::Official, RiskCategory::Sanctions),
            ev("trade", ts(6, 0), SourceQuality::Industry, RiskCategory::Logistics),
        ])
        .await
        .unwrap();

    let mut q = EventQuery::new("copper", since_epoch());
    q.limit = 1;
    q.qualities = Some([SourceQuality::Official, SourceQuality::Industry].into_iter().collect());
    let page = store.query_events(&q).await.unwrap();
    assert_eq!(page.events.len(), 1);
    assert_eq!(page.events[0].id, "gov");

    q.limit = 10;
    q.risk = Some("logist".into());
    let page = store.query_events(&q).await.unwrap();
    let ids: Vec<&str> = page.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["trade"]);

    q.risk = None;
    q.material = "nickel".into();
    assert!(store.query_events(&q).await.unwrap().events.is_empty());
}

#[tokio::test]
async fn cursor_walks_every_undated_event_of_a_run() {
    let (_dir, store) = temp_store().await;
    let builder = EventBuilder::with_defaults(ts(15, 9));
    let events: Vec<Event> = (0..4)
        .map(|i| {
            builder
                .build(RawDocument {
                    title: format!("Treasury Sanctions Network Number {i}"),
                    url: format!("https://home.treasury.gov/news/press-releases/sb{i}"),
                    source_name: "U.S. Treasury".into(),
                    force_include: true,
                    ..Default::default()
                })
                .expect("forced")
        })
        .collect();
    store.upsert_events(&events).await.unwrap();

    let mut q = EventQuery::new("copper", since_epoch());
    q.limit = 1;
    let mut seen = Vec::new();
    loop {
        let page = store.query_events(&q).await.unwrap();
        if page.events.is_empty() {
            break;
        }
        seen.extend(page.events.into_iter().map(|e| e.id));
        q.cursor = page.next_cursor;
    }

    let want: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
    assert_eq!(seen, want);
}
