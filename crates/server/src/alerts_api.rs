//! Alert endpoints. Lifecycle flags are independent: acknowledge and
//! silence stack on an active alert, resolve flips `is_active` off.
//! Silences expire by clock comparison at read time, never by a write.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use opsdeck_core::{Alert, AlertSeverity};

use crate::db::MAX_SILENCE_MINUTES;
use crate::error::ApiError;
use crate::routes::{parse_filter, SharedState};

#[derive(Debug, Deserialize)]
pub struct AlertListParams {
    pub severity: Option<String>,
    pub is_active: Option<bool>,
    pub service_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub title: Option<String>,
    pub name: Option<String>,
    pub service_id: Option<String>,
    pub severity: Option<AlertSeverity>,
    pub message: Option<String>,
    pub metric_name: Option<String>,
    pub threshold: Option<f64>,
    pub current_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAlertRequest {
    pub title: Option<String>,
    pub severity: Option<AlertSeverity>,
    pub message: Option<String>,
    pub metric_name: Option<String>,
    pub threshold: Option<f64>,
    pub current_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct SilenceRequest {
    pub duration_minutes: Option<i64>,
}

pub async fn list_alerts(
    State(state): State<SharedState>,
    Query(params): Query<AlertListParams>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let severity = parse_filter::<AlertSeverity>(params.severity.as_deref())?;
    let alerts = state
        .db
        .list_alerts(severity, params.is_active, params.service_id.as_deref())?;
    Ok(Json(alerts))
}

pub async fn create_alert(
    State(state): State<SharedState>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let title = req
        .title
        .or_else(|| req.name.clone())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?;

    let now = Utc::now();
    let alert = Alert {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        name: req.name,
        service_id: req.service_id,
        severity: req.severity.unwrap_or(AlertSeverity::Info),
        message: req.message,
        metric_name: req.metric_name,
        threshold: req.threshold,
        current_value: req.current_value,
        is_active: true,
        fired_at: now,
        acknowledged_at: None,
        silenced_until: None,
        resolved_at: None,
        created_at: now,
    };
    state.db.insert_alert(&alert)?;

    tracing::info!(title = %alert.title, severity = alert.severity.as_str(), "alert fired");
    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn update_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAlertRequest>,
) -> Result<Json<Alert>, ApiError> {
    let Some(mut alert) = state.db.get_alert(&id)? else {
        return Err(ApiError::NotFound("alert"));
    };

    if let Some(title) = req.title {
        alert.title = title;
    }
    if let Some(severity) = req.severity {
        alert.severity = severity;
    }
    if let Some(message) = req.message {
        alert.message = Some(message);
    }
    if let Some(metric_name) = req.metric_name {
        alert.metric_name = Some(metric_name);
    }
    if let Some(threshold) = req.threshold {
        alert.threshold = Some(threshold);
    }
    if let Some(current_value) = req.current_value {
        alert.current_value = Some(current_value);
    }

    if !state.db.update_alert(&alert)? {
        return Err(ApiError::NotFound("alert"));
    }
    Ok(Json(alert))
}

pub async fn acknowledge_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    match state.db.acknowledge_alert(&id)? {
        Some(alert) => {
            tracing::info!(%id, "alert acknowledged");
            Ok(Json(alert))
        }
        None => Err(ApiError::NotFound("alert")),
    }
}

pub async fn silence_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Option<Json<SilenceRequest>>,
) -> Result<Json<Alert>, ApiError> {
    let minutes = body
        .and_then(|Json(r)| r.duration_minutes)
        .unwrap_or(60);
    if minutes <= 0 || minutes > MAX_SILENCE_MINUTES {
        return Err(ApiError::BadRequest(format!(
            "duration_minutes must be between 1 and {MAX_SILENCE_MINUTES}"
        )));
    }
    match state.db.silence_alert(&id, minutes)? {
        Some(alert) => {
            tracing::info!(%id, minutes, "alert silenced");
            Ok(Json(alert))
        }
        None => Err(ApiError::NotFound("alert")),
    }
}

pub async fn resolve_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    match state.db.resolve_alert(&id)? {
        Some(alert) => {
            tracing::info!(%id, "alert resolved");
            Ok(Json(alert))
        }
        None => Err(ApiError::NotFound("alert")),
    }
}

pub async fn delete_alert(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.db.delete_alert(&id)? {
        return Err(ApiError::NotFound("alert"));
    }
    Ok(Json(json!({ "success": true })))
}
