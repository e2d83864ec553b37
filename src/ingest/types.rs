// src/ingest/types.rs
use thiserror::Error;

use crate::analyze::classify::{is_uncategorized, risk_categories, Classifier};
use crate::event::{Event, Location};
use crate::ingest::builder::EventBuilder;
use crate::ingest::fetch::{BlockedSignal, FetchError};

/// One candidate document extracted by an adapter, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDocument {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source_name: String,
    /// Source-provided date string, parsed best-effort.
    pub published_raw: Option<String>,
    /// Caller-supplied location; wins over geo-inference.
    pub location: Option<Location>,
    /// Bypass the commodity relevance gate.
    pub force_include: bool,
}

/// How an adapter decides `force_include` for its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inclusion {
    /// General news: the relevance gate decides.
    Gated,
    /// Inherently in-domain sources (e.g. a sanctions regulator).
    Forced,
    /// Forced when the text hits any risk category or is commodity-relevant.
    ForcedWhenRisky,
}

impl Inclusion {
    pub fn force_include(&self, text: &str, classifier: &Classifier) -> bool {
        match self {
            Inclusion::Gated => false,
            Inclusion::Forced => true,
            Inclusion::ForcedWhenRisky => {
                !is_uncategorized(&risk_categories(text)) || classifier.is_relevant(text)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0}")]
    Blocked(BlockedSignal),

    /// Transport failure that outlived the fetcher's retries.
    #[error("network error: {0}")]
    Network(#[source] FetchError),

    #[error("{0}")]
    Http(#[source] FetchError),

    #[error("malformed response from {source_name}: {detail}")]
    Malformed { source_name: String, detail: String },

    #[error("{source_name} error: {message}")]
    Upstream {
        source_name: String,
        message: String,
    },
}

impl From<FetchError> for SourceError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status { .. } => SourceError::Http(e),
            other => SourceError::Network(other),
        }
    }
}

impl From<BlockedSignal> for SourceError {
    fn from(b: BlockedSignal) -> Self {
        SourceError::Blocked(b)
    }
}

/// Terminal result of one adapter invocation.
#[derive(Debug)]
pub enum SourceOutcome {
    Collected(Vec<Event>),
    Blocked(String),
    Failed(SourceError),
}

impl From<Result<Vec<Event>, SourceError>> for SourceOutcome {
    fn from(r: Result<Vec<Event>, SourceError>) -> Self {
        match r {
            Ok(events) => SourceOutcome::Collected(events),
            Err(SourceError::Blocked(b)) => SourceOutcome::Blocked(b.to_string()),
            Err(e) => SourceOutcome::Failed(e),
        }
    }
}

/// Per-run inputs shared by every adapter.
#[derive(Debug, Clone)]
pub struct IngestContext {
    /// How far back upstream queries look, where the source supports it.
    pub days: u32,
    pub builder: EventBuilder,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Report label, e.g. "GDELT".
    fn name(&self) -> &str;

    /// Never panics; failures come back as `Blocked` / `Failed`.
    async fn collect(&self, ctx: &IngestContext) -> SourceOutcome;
}
