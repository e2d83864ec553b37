// tests/properties.rs
//
// Seeded randomized checks over the classifier, geo resolver and builder.

use chrono::{TimeZone, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use geo_monitor::analyze::classify::{risk_categories, severity};
use geo_monitor::analyze::{GeoResolver, Precision};
use geo_monitor::event::event_id;
use geo_monitor::ingest::builder::EventBuilder;
use geo_monitor::ingest::types::RawDocument;

const WORDS: &[&str] = &[
    "copper", "codelco", "strike", "shutdown", "collapse", "ban", "embargo", "blockade",
    "attack", "sanction", "halt", "delay", "protest", "tighten", "restriction", "port",
    "tariff", "war", "union", "Chile", "Peru", "Zambia", "Grasberg", "Antofagasta", "the",
    "market", "outlook", "smelter", "quarterly", "<b>", "</b>", "&amp;", "weather", "rally",
];

fn random_text(rng: &mut StdRng) -> String {
    let n = rng.random_range(0..24);
    (0..n)
        .map(|_| WORDS[rng.random_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn severity_is_bounded_and_categories_non_empty() {
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for _ in 0..2_000 {
        let text = random_text(&mut rng);
        let cats = risk_categories(&text);
        assert!(!cats.is_empty(), "no categories for {text:?}");
        let s = severity(&text, &cats);
        assert!(s <= 100, "severity {s} for {text:?}");
    }
}

#[test]
fn ids_are_deterministic_and_fixed_width() {
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..500 {
        let url = format!("https://x.test/{}/{}", i, rng.random_range(0..1_000_000u32));
        let title = random_text(&mut rng);
        let a = event_id(&url, &title);
        assert_eq!(a, event_id(&url, &title));
        assert_eq!(a.len(), 18);
    }
}

#[test]
fn entity_always_beats_country() {
    let geo = GeoResolver::builtin();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let text = format!("{} Codelco {}", random_text(&mut rng), random_text(&mut rng));
        let m = geo.resolve(&text);
        assert_eq!(m.precision, Precision::Entity, "{text:?}");
        assert_eq!(m.centroid.expect("centroid").name, "Codelco, Chile");
    }
}

#[test]
fn built_events_hold_invariants() {
    let builder = EventBuilder::with_defaults(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    let mut rng = StdRng::seed_from_u64(2024);
    let mut built = 0;
    for i in 0..1_000 {
        let doc = RawDocument {
            title: random_text(&mut rng),
            summary: random_text(&mut rng),
            url: format!("https://x.test/{i}"),
            source_name: "Rand".into(),
            force_include: rng.random_bool(0.3),
            ..Default::default()
        };
        let Some(ev) = builder.build(doc) else { continue };
        built += 1;
        assert!(ev.severity <= 100);
        assert!(!ev.risk_type.is_empty());
        assert!(!ev.countries.is_empty());
        assert!(!ev.title.is_empty());
        assert_eq!(ev.materials, vec!["Copper".to_string()]);
        assert!(ev.tags.contains(&"COPPER".to_string()));
    }
    assert!(built > 0);
}
