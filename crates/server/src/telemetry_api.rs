//! Log and metric ingestion/read endpoints. Both tables are
//! append-only; reads are reverse chronological and capped.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use opsdeck_core::{LogEntry, LogLevel, MetricSample};

use crate::error::ApiError;
use crate::routes::{parse_filter, SharedState};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Accepts either a single object or an array of them, matching the
/// original ingestion contract.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

fn effective_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
}

// ==========================================================================
// Logs
// ==========================================================================

#[derive(Debug, Deserialize)]
pub struct LogListParams {
    pub service_id: Option<String>,
    pub level: Option<String>,
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct IngestLogRequest {
    pub service_id: Option<String>,
    pub level: Option<LogLevel>,
    pub message: String,
    pub trace_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

pub async fn list_logs(
    State(state): State<SharedState>,
    Query(params): Query<LogListParams>,
) -> Result<Json<Vec<LogEntry>>, ApiError> {
    let level = parse_filter::<LogLevel>(params.level.as_deref())?;
    let entries = state.db.list_logs(
        params.service_id.as_deref(),
        level,
        params.since,
        effective_limit(params.limit),
    )?;
    Ok(Json(entries))
}

pub async fn ingest_logs(
    State(state): State<SharedState>,
    Json(body): Json<OneOrMany<IngestLogRequest>>,
) -> Result<(StatusCode, Json<Vec<LogEntry>>), ApiError> {
    let requests = body.into_vec();
    if requests.is_empty() {
        return Err(ApiError::BadRequest("empty log batch".to_string()));
    }

    let entries: Vec<LogEntry> = requests
        .into_iter()
        .map(|req| LogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            service_id: req.service_id,
            level: req.level.unwrap_or(LogLevel::Info),
            message: req.message,
            trace_id: req.trace_id,
            metadata: req.metadata,
            created_at: req.created_at.unwrap_or_else(Utc::now),
        })
        .collect();

    let count = state.db.insert_logs(&entries)?;
    tracing::debug!(count, "ingested logs");
    Ok((StatusCode::CREATED, Json(entries)))
}

pub async fn clear_logs(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cleared = state.db.clear_logs()?;
    tracing::info!(cleared, "bulk-cleared logs");
    Ok(Json(json!({ "cleared": cleared })))
}

// ==========================================================================
// Metrics
// ==========================================================================

#[derive(Debug, Deserialize)]
pub struct MetricListParams {
    pub service_id: Option<String>,
    pub metric_name: Option<String>,
    pub limit: Option<usize>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct IngestMetricRequest {
    pub service_id: Option<String>,
    pub metric_name: String,
    pub value: f64,
    pub unit: Option<String>,
    pub recorded_at: Option<DateTime<Utc>>,
}

pub async fn list_metrics(
    State(state): State<SharedState>,
    Query(params): Query<MetricListParams>,
) -> Result<Json<Vec<MetricSample>>, ApiError> {
    let samples = state.db.list_metrics(
        params.service_id.as_deref(),
        params.metric_name.as_deref(),
        params.since,
        effective_limit(params.limit),
    )?;
    Ok(Json(samples))
}

pub async fn ingest_metrics(
    State(state): State<SharedState>,
    Json(body): Json<OneOrMany<IngestMetricRequest>>,
) -> Result<(StatusCode, Json<Vec<MetricSample>>), ApiError> {
    let requests = body.into_vec();
    if requests.is_empty() {
        return Err(ApiError::BadRequest("empty metric batch".to_string()));
    }

    let samples: Vec<MetricSample> = requests
        .into_iter()
        .map(|req| MetricSample {
            id: uuid::Uuid::new_v4().to_string(),
            service_id: req.service_id,
            metric_name: req.metric_name,
            value: req.value,
            unit: req.unit,
            recorded_at: req.recorded_at.unwrap_or_else(Utc::now),
        })
        .collect();

    let count = state.db.insert_metrics(&samples)?;
    tracing::debug!(count, "ingested metrics");
    Ok((StatusCode::CREATED, Json(samples)))
}
