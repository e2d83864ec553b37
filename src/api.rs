// src/api.rs
//! Thin HTTP surface: trigger a run, query stored events.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::event::Event;
use crate::ingest::normalize::format_utc_z;
use crate::ingest::{Pipeline, ReportEntry};
use crate::source_quality::SourceQuality;
use crate::store::{EventQuery, EventStore};

pub const DEFAULT_QUALITY_FILTER: &str = "OFFICIAL,MAJOR_MEDIA,INDUSTRY";
const MAX_DAYS: i64 = 30;
const MAX_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
    store: EventStore,
    default_days: u32,
    /// One ingestion run at a time.
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, store: EventStore, default_days: u32) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            default_days: default_days.clamp(1, MAX_DAYS as u32),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ingest/run", post(ingest_run))
        .route("/events", get(list_events))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

fn in_range(name: &str, v: i64, max: i64) -> Result<i64, ApiError> {
    if (1..=max).contains(&v) {
        Ok(v)
    } else {
        Err(ApiError::Unprocessable(format!(
            "{name} must be between 1 and {max}, got {v}"
        )))
    }
}

#[derive(Debug, Deserialize)]
struct RunParams {
    days: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RunResp {
    status: &'static str,
    events_ingested: usize,
    sources: Vec<ReportEntry>,
}

async fn ingest_run(
    State(state): State<AppState>,
    Query(p): Query<RunParams>,
) -> Result<Json<RunResp>, ApiError> {
    let days = match p.days {
        Some(d) => in_range("days", d, MAX_DAYS)? as u32,
        None => state.default_days,
    };

    let _guard = state.run_lock.lock().await;
    let run = state.pipeline.run(days).await;
    state.store.upsert_events(&run.events).await.map_err(|e| {
        error!(error = %e, "persisting ingestion run failed");
        ApiError::Internal(e.to_string())
    })?;
    info!(events = run.events.len(), "ingestion run persisted");

    Ok(Json(RunResp {
        status: "success",
        events_ingested: run.events.len(),
        sources: run.report,
    }))
}

#[derive(Debug, Deserialize)]
struct EventsParams {
    material: Option<String>,
    days: Option<i64>,
    risk: Option<String>,
    quality: Option<String>,
    limit: Option<i64>,
    cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct FiltersApplied {
    material: String,
    days: i64,
    risk: Option<String>,
    quality: String,
    limit: i64,
    cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventsResp {
    events: Vec<Event>,
    count: usize,
    next_cursor: Option<String>,
    #[serde(rename = "filters_applied")]
    filters_applied: FiltersApplied,
}

/// `ALL` disables the filter; otherwise a comma-separated label list.
fn parse_quality_filter(raw: &str) -> Result<Option<HashSet<SourceQuality>>, ApiError> {
    if raw.trim().eq_ignore_ascii_case("ALL") {
        return Ok(None);
    }
    let set = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<SourceQuality>()
                .map_err(|e| ApiError::Unprocessable(e.to_string()))
        })
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(if set.is_empty() { None } else { Some(set) })
}

async fn list_events(
    State(state): State<AppState>,
    Query(p): Query<EventsParams>,
) -> Result<Json<EventsResp>, ApiError> {
    let days = in_range("days", p.days.unwrap_or(7), MAX_DAYS)?;
    let limit = in_range("limit", p.limit.unwrap_or(200), MAX_LIMIT)?;
    let material = p
        .material
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| "copper".to_string());
    let quality = p
        .quality
        .unwrap_or_else(|| DEFAULT_QUALITY_FILTER.to_string());
    let cursor = p
        .cursor
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(|c| {
            DateTime::parse_from_rfc3339(c.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| ApiError::Unprocessable(format!("invalid cursor {c:?}: {e}")))
        })
        .transpose()?;

    let q = EventQuery {
        material: material.clone(),
        since: Utc::now() - Duration::days(days),
        risk: p.risk.clone().filter(|r| !r.trim().is_empty()),
        qualities: parse_quality_filter(&quality)?,
        limit: limit as usize,
        cursor,
    };
    let page = state.store.query_events(&q).await.map_err(|e| {
        error!(error = %e, "querying events failed");
        ApiError::Internal(e.to_string())
    })?;

    Ok(Json(EventsResp {
        count: page.events.len(),
        next_cursor: page.next_cursor.as_ref().map(format_utc_z),
        events: page.events,
        filters_applied: FiltersApplied {
            material,
            days,
            risk: q.risk,
            quality,
            limit,
            cursor: cursor.as_ref().map(format_utc_z),
        },
    }))
}
