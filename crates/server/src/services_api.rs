//! Service CRUD endpoints. Thin wrappers over the store: services are
//! written by external monitoring or manual edits, never derived.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use opsdeck_core::{Service, ServiceStatus};

use crate::error::ApiError;
use crate::routes::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ServiceStatus>,
    pub uptime: Option<f64>,
    pub latency_p50: Option<f64>,
    pub latency_p99: Option<f64>,
    pub error_rate: Option<f64>,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub requests_per_second: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ServiceStatus>,
    pub uptime: Option<f64>,
    pub latency_p50: Option<f64>,
    pub latency_p99: Option<f64>,
    pub error_rate: Option<f64>,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub requests_per_second: Option<f64>,
}

pub async fn list_services(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Service>>, ApiError> {
    let services = state.db.list_services()?;
    Ok(Json(services))
}

pub async fn get_service(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Service>, ApiError> {
    match state.db.get_service(&id)? {
        Some(service) => Ok(Json(service)),
        None => Err(ApiError::NotFound("service")),
    }
}

pub async fn create_service(
    State(state): State<SharedState>,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let now = Utc::now();
    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        display_name: req.display_name.unwrap_or_else(|| req.name.clone()),
        name: req.name,
        description: req.description,
        status: req.status.unwrap_or(ServiceStatus::Healthy),
        uptime: req.uptime.unwrap_or(99.9),
        latency_p50: req.latency_p50.unwrap_or(0.0),
        latency_p99: req.latency_p99.unwrap_or(0.0),
        error_rate: req.error_rate.unwrap_or(0.0),
        cpu_usage: req.cpu_usage.unwrap_or(0.0),
        memory_usage: req.memory_usage.unwrap_or(0.0),
        requests_per_second: req.requests_per_second.unwrap_or(0.0),
        created_at: now,
        updated_at: now,
        last_checked_at: None,
    };
    state.db.insert_service(&service)?;

    tracing::info!(name = %service.name, "created service");
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update_service(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, ApiError> {
    let Some(mut service) = state.db.get_service(&id)? else {
        return Err(ApiError::NotFound("service"));
    };

    if let Some(name) = req.name {
        service.name = name;
    }
    if let Some(display_name) = req.display_name {
        service.display_name = display_name;
    }
    if let Some(description) = req.description {
        service.description = Some(description);
    }
    if let Some(status) = req.status {
        service.status = status;
    }
    if let Some(uptime) = req.uptime {
        service.uptime = uptime;
    }
    if let Some(latency_p50) = req.latency_p50 {
        service.latency_p50 = latency_p50;
    }
    if let Some(latency_p99) = req.latency_p99 {
        service.latency_p99 = latency_p99;
    }
    if let Some(error_rate) = req.error_rate {
        service.error_rate = error_rate;
    }
    if let Some(cpu_usage) = req.cpu_usage {
        service.cpu_usage = cpu_usage;
    }
    if let Some(memory_usage) = req.memory_usage {
        service.memory_usage = memory_usage;
    }
    if let Some(rps) = req.requests_per_second {
        service.requests_per_second = rps;
    }
    service.updated_at = Utc::now();
    service.last_checked_at = Some(service.updated_at);

    if !state.db.update_service(&service)? {
        return Err(ApiError::NotFound("service"));
    }
    Ok(Json(service))
}

pub async fn delete_service(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.db.delete_service(&id)? {
        return Err(ApiError::NotFound("service"));
    }
    tracing::info!(%id, "deleted service");
    Ok(Json(json!({ "success": true })))
}
