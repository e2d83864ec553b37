//! Geo Monitor binary entrypoint.
//! Loads configuration, prepares the event store and serves the HTTP API.

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use geo_monitor::metrics::Metrics;
use geo_monitor::{create_router, AppState, EventStore, MonitorConfig, Pipeline};

/// `RUST_LOG` wins; `LOG_FORMAT=json` switches to structured JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geo_monitor=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = MonitorConfig::load_default().context("loading configuration")?;

    let store = EventStore::new(&cfg.store.database_url)
        .with_context(|| format!("opening store {}", cfg.store.database_url))?;
    store.init().await.context("initializing event store")?;

    let pipeline = Pipeline::from_config(&cfg).context("building ingestion pipeline")?;
    info!(sources = ?pipeline.source_names(), "ingestion pipeline ready");

    let mut router = create_router(AppState::new(pipeline, store, cfg.ingest.default_days));
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => warn!(error = %e, "prometheus recorder not installed; /metrics disabled"),
    }

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    info!(addr = %cfg.server.bind, "listening");
    axum::serve(listener, router).await.context("serving HTTP")?;
    Ok(())
}
