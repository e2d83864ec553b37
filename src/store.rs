// src/store.rs
//! SQLite persistence for events. One connection per operation; the engine's
//! own locking arbitrates concurrent writers.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::Event;
use crate::ingest::normalize::format_sort_key;
use crate::source_quality::SourceQuality;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("encoding event payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Filters for `EventStore::query_events`. All filters apply before `limit`.
#[derive(Debug, Clone)]
pub struct EventQuery {
    /// Exact, case-insensitive match against `Event::materials`.
    pub material: String,
    /// Inclusive lower bound on `published_at`.
    pub since: DateTime<Utc>,
    /// Case-insensitive substring over risk categories.
    pub risk: Option<String>,
    /// `None` admits every quality.
    pub qualities: Option<HashSet<SourceQuality>>,
    pub limit: usize,
    /// Only events strictly older than this.
    pub cursor: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn new(material: impl Into<String>, since: DateTime<Utc>) -> Self {
        Self {
            material: material.into(),
            since,
            risk: None,
            qualities: None,
            limit: 200,
            cursor: None,
        }
    }

    fn matches(&self, ev: &Event) -> bool {
        let mat = self.material.trim().to_lowercase();
        if !mat.is_empty() && !ev.materials.iter().any(|m| m.to_lowercase() == mat) {
            return false;
        }
        if let Some(risk) = self.risk.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            let risk_l = risk.to_lowercase();
            if !ev.risk_type.iter().any(|r| r.as_str().contains(&risk_l)) {
                return false;
            }
        }
        if let Some(q) = &self.qualities {
            if !q.contains(&ev.source_quality) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventPage {
    pub events: Vec<Event>,
    /// Timestamp of the last returned event; pass back as `cursor` for the next page.
    pub next_cursor: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct EventStore {
    options: SqliteConnectOptions,
}

impl EventStore {
    /// `database_url` like `sqlite://events.db`; the file is created on first use.
    /// `sqlite::memory:` is accepted but every operation then sees a fresh database.
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Ok(Self { options })
    }

    async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        Ok(self.options.connect().await?)
    }

    /// Create the schema if absent.
    pub async fn init(&self) -> Result<(), StoreError> {
        let mut conn = self.connect().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                published_at TEXT NOT NULL,
                source_quality TEXT NOT NULL
            )
            "#,
        )
        .execute(&mut conn)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_published_at ON events(published_at)")
            .execute(&mut conn)
            .await?;
        conn.close().await?;
        Ok(())
    }

    /// Insert-or-replace by id, one transaction per batch. Idempotent.
    pub async fn upsert_events(&self, events: &[Event]) -> Result<usize, StoreError> {
        if events.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;
        for ev in events {
            let payload = serde_json::to_string(ev)?;
            sqlx::query(
                "INSERT OR REPLACE INTO events (id, payload, published_at, source_quality) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&ev.id)
            .bind(payload)
            .bind(format_sort_key(&ev.published_at))
            .bind(ev.source_quality.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        conn.close().await?;
        debug!(events = events.len(), "upserted events");
        Ok(events.len())
    }

    /// Newest first (`published_at` desc, then `id` asc).
    pub async fn query_events(&self, q: &EventQuery) -> Result<EventPage, StoreError> {
        let mut conn = self.connect().await?;
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT payload FROM events \
             WHERE published_at >= ?1 AND (?2 IS NULL OR published_at < ?2) \
             ORDER BY published_at DESC, id ASC",
        )
        .bind(format_sort_key(&q.since))
        .bind(q.cursor.as_ref().map(format_sort_key))
        .fetch_all(&mut conn)
        .await?;
        conn.close().await?;

        let mut events = Vec::new();
        for (payload,) in rows {
            if events.len() >= q.limit {
                break;
            }
            let ev: Event = match serde_json::from_str(&payload) {
                Ok(ev) => ev,
                Err(e) => {
                    warn!(error = %e, "skipping undecodable event row");
                    continue;
                }
            };
            if q.matches(&ev) {
                events.push(ev);
            }
        }

        let next_cursor = events.last().map(|e| e.published_at);
        Ok(EventPage {
            events,
            next_cursor,
        })
    }

    /// Total stored rows, regardless of filters.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let mut conn = self.connect().await?;
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&mut conn)
            .await?;
        conn.close().await?;
        Ok(n)
    }
}
