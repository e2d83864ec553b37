// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod event;
pub mod ingest;
pub mod metrics;
pub mod source_quality;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::MonitorConfig;
pub use crate::event::{Event, Location};
pub use crate::ingest::{IngestRun, Pipeline, ReportEntry, SourceStatus};
pub use crate::store::{EventPage, EventQuery, EventStore};
