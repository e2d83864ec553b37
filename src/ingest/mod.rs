// src/ingest/mod.rs
pub mod builder;
pub mod fetch;
pub mod normalize;
pub mod providers;
pub mod types;

use anyhow::Context;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::analyze::{Classifier, GeoResolver};
use crate::config::MonitorConfig;
use crate::event::Event;
use crate::ingest::builder::EventBuilder;
use crate::ingest::fetch::ResilientFetcher;
use crate::ingest::types::{IngestContext, SourceOutcome, SourceProvider};
use crate::source_quality::SourceQualityConfig;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_runs_total", "Completed ingestion runs.");
        describe_counter!(
            "ingest_events_total",
            "Events emitted by runs after the identity merge."
        );
        describe_counter!(
            "ingest_source_events_total",
            "Events produced per source before the merge."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that ended a run in the error state."
        );
        describe_counter!(
            "ingest_source_blocked_total",
            "Sources that were refused by upstream (403/451)."
        );
        describe_counter!(
            "ingest_fetch_retries_total",
            "Fetch attempts retried after a transient failure."
        );
        describe_histogram!(
            "ingest_source_duration_ms",
            "Wall time of one source invocation in milliseconds."
        );
        describe_gauge!("ingest_last_run_ts", "Unix ts when the last ingestion run finished.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Empty,
    Blocked,
    Error,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Empty => "empty",
            SourceStatus::Blocked => "blocked",
            SourceStatus::Error => "error",
        }
    }
}

/// Per-source line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub source: String,
    pub status: SourceStatus,
    pub events: usize,
    /// Block reason or error message, verbatim.
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Result of one run: merged events (newest first) plus one report entry per source.
#[derive(Debug, Clone, Default)]
pub struct IngestRun {
    pub events: Vec<Event>,
    pub report: Vec<ReportEntry>,
}

/// Identity merge: later batches overwrite earlier ones on equal `id`.
/// Output is ordered by `published_at` desc, then `id` asc.
pub fn merge_by_id<I>(batches: I) -> Vec<Event>
where
    I: IntoIterator<Item = Vec<Event>>,
{
    let mut by_id: HashMap<String, Event> = HashMap::new();
    for batch in batches {
        for ev in batch {
            by_id.insert(ev.id.clone(), ev);
        }
    }
    let mut out: Vec<Event> = by_id.into_values().collect();
    out.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    out
}

/// Invoke every provider once, sequentially in declaration order.
/// Never fails: each source's failure becomes its report entry.
pub async fn run_providers(providers: &[Box<dyn SourceProvider>], ctx: &IngestContext) -> IngestRun {
    ensure_metrics_described();

    let mut batches = Vec::with_capacity(providers.len());
    let mut report = Vec::with_capacity(providers.len());

    for p in providers {
        let source = p.name().to_string();
        let t0 = Instant::now();
        let outcome = p.collect(ctx).await;
        let duration_ms = t0.elapsed().as_millis() as u64;
        histogram!("ingest_source_duration_ms").record(duration_ms as f64);

        let entry = match outcome {
            SourceOutcome::Collected(events) => {
                let n = events.len();
                let status = if n > 0 {
                    SourceStatus::Ok
                } else {
                    SourceStatus::Empty
                };
                info!(source = %source, status = status.as_str(), events = n, duration_ms, "source finished");
                counter!("ingest_source_events_total").increment(n as u64);
                batches.push(events);
                ReportEntry {
                    source,
                    status,
                    events: n,
                    error: None,
                    duration_ms,
                }
            }
            SourceOutcome::Blocked(reason) => {
                warn!(source = %source, status = "blocked", reason = %reason, duration_ms, "source blocked");
                counter!("ingest_source_blocked_total").increment(1);
                ReportEntry {
                    source,
                    status: SourceStatus::Blocked,
                    events: 0,
                    error: Some(reason),
                    duration_ms,
                }
            }
            SourceOutcome::Failed(e) => {
                warn!(source = %source, status = "error", error = %e, duration_ms, "source skipped due to error");
                counter!("ingest_source_errors_total").increment(1);
                ReportEntry {
                    source,
                    status: SourceStatus::Error,
                    events: 0,
                    error: Some(e.to_string()),
                    duration_ms,
                }
            }
        };
        report.push(entry);
    }

    let events = merge_by_id(batches);

    counter!("ingest_runs_total").increment(1);
    counter!("ingest_events_total").increment(events.len() as u64);
    gauge!("ingest_last_run_ts").set(Utc::now().timestamp() as f64);
    info!(events = events.len(), sources = report.len(), "ingestion run finished");

    IngestRun { events, report }
}

/// Configured adapter set plus the shared reference data every run builds from.
pub struct Pipeline {
    providers: Vec<Box<dyn SourceProvider>>,
    quality: Arc<SourceQualityConfig>,
    geo: Arc<GeoResolver>,
    classifier: Arc<Classifier>,
}

impl Pipeline {
    pub fn new(providers: Vec<Box<dyn SourceProvider>>, quality: SourceQualityConfig) -> Self {
        Self {
            providers,
            quality: Arc::new(quality),
            geo: Arc::new(GeoResolver::builtin()),
            classifier: Arc::new(Classifier::copper()),
        }
    }

    /// Production wiring: one shared fetcher, the five default adapters.
    pub fn from_config(cfg: &MonitorConfig) -> anyhow::Result<Self> {
        let fetcher = ResilientFetcher::with_user_agent(cfg.fetch.policy(), &cfg.fetch.user_agent)
            .context("building HTTP client")?;
        let geo = cfg.geo.resolver().context("compiling geo patterns")?;
        let providers = providers::default_providers(&cfg.ingest, &fetcher);
        Ok(Self::new(providers, cfg.quality.clone()).with_geo(geo))
    }

    pub fn with_geo(mut self, geo: GeoResolver) -> Self {
        self.geo = Arc::new(geo);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// `days` bounds upstream lookback where a source supports it; it does not
    /// filter events after the fact.
    pub async fn run(&self, days: u32) -> IngestRun {
        let ctx = IngestContext {
            days: days.max(1),
            builder: EventBuilder::new(
                self.quality.clone(),
                self.geo.clone(),
                self.classifier.clone(),
                Utc::now(),
            ),
        };
        info!(days = ctx.days, sources = self.providers.len(), "ingestion run starting");
        run_providers(&self.providers, &ctx).await
    }
}
