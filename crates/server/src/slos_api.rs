//! SLO endpoints. `is_breaching` and `is_budget_exhausted` are never
//! accepted from callers; they are recomputed from the post-merge
//! source fields on every create and update.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use opsdeck_core::Slo;

use crate::error::ApiError;
use crate::routes::SharedState;

#[derive(Debug, Deserialize)]
pub struct SloListParams {
    pub service_id: Option<String>,
    pub breaching: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSloRequest {
    pub name: String,
    pub service_id: Option<String>,
    pub target_availability: Option<f64>,
    pub current_availability: Option<f64>,
    pub latency_target: Option<f64>,
    pub latency_current: Option<f64>,
    pub error_budget_total: Option<f64>,
    pub error_budget_consumed: Option<f64>,
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSloRequest {
    pub name: Option<String>,
    pub service_id: Option<String>,
    pub target_availability: Option<f64>,
    pub current_availability: Option<f64>,
    pub latency_target: Option<f64>,
    pub latency_current: Option<f64>,
    pub error_budget_total: Option<f64>,
    pub error_budget_consumed: Option<f64>,
    pub period: Option<String>,
}

pub async fn list_slos(
    State(state): State<SharedState>,
    Query(params): Query<SloListParams>,
) -> Result<Json<Vec<Slo>>, ApiError> {
    let slos = state
        .db
        .list_slos(params.service_id.as_deref(), params.breaching)?;
    Ok(Json(slos))
}

pub async fn create_slo(
    State(state): State<SharedState>,
    Json(req): Json<CreateSloRequest>,
) -> Result<(StatusCode, Json<Slo>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let now = Utc::now();
    let mut slo = Slo {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name,
        service_id: req.service_id,
        target_availability: req.target_availability.unwrap_or(99.9),
        current_availability: req.current_availability.unwrap_or(100.0),
        latency_target: req.latency_target.unwrap_or(200.0),
        latency_current: req.latency_current.unwrap_or(0.0),
        error_budget_total: req.error_budget_total.unwrap_or(0.1),
        error_budget_consumed: req.error_budget_consumed.unwrap_or(0.0),
        is_breaching: false,
        is_budget_exhausted: false,
        period: req.period.unwrap_or_else(|| "30d".to_string()),
        created_at: now,
        updated_at: now,
    };
    slo.recompute_derived();
    state.db.insert_slo(&slo)?;

    tracing::info!(name = %slo.name, "created SLO");
    Ok((StatusCode::CREATED, Json(slo)))
}

pub async fn update_slo(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSloRequest>,
) -> Result<Json<Slo>, ApiError> {
    let Some(mut slo) = state.db.get_slo(&id)? else {
        return Err(ApiError::NotFound("SLO"));
    };

    if let Some(name) = req.name {
        slo.name = name;
    }
    if let Some(service_id) = req.service_id {
        slo.service_id = Some(service_id);
    }
    if let Some(target) = req.target_availability {
        slo.target_availability = target;
    }
    if let Some(current) = req.current_availability {
        slo.current_availability = current;
    }
    if let Some(latency_target) = req.latency_target {
        slo.latency_target = latency_target;
    }
    if let Some(latency_current) = req.latency_current {
        slo.latency_current = latency_current;
    }
    if let Some(total) = req.error_budget_total {
        slo.error_budget_total = total;
    }
    if let Some(consumed) = req.error_budget_consumed {
        slo.error_budget_consumed = consumed;
    }
    if let Some(period) = req.period {
        slo.period = period;
    }
    slo.updated_at = Utc::now();
    // Derived against the merged values, not the request's view of them.
    slo.recompute_derived();

    if !state.db.update_slo(&slo)? {
        return Err(ApiError::NotFound("SLO"));
    }
    Ok(Json(slo))
}

pub async fn delete_slo(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.db.delete_slo(&id)? {
        return Err(ApiError::NotFound("SLO"));
    }
    Ok(Json(json!({ "success": true })))
}
