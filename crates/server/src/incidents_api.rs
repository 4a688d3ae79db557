//! Incident endpoints. Status moves only through the guarded state
//! machine (OPEN -> ONGOING -> RESOLVED); the general update endpoint
//! cannot touch it. Every transition carries its audit event in the
//! same transaction.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use opsdeck_core::{
    Incident, IncidentEvent, IncidentEventType, IncidentSeverity, IncidentStatus,
};

use crate::db::{IncidentAction, NewIncident, TransitionOutcome};
use crate::error::ApiError;
use crate::routes::{parse_filter, SharedState};

#[derive(Debug, Deserialize)]
pub struct IncidentListParams {
    pub status: Option<String>,
    pub severity: Option<String>,
    pub service_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIncidentRequest {
    pub title: String,
    pub description: Option<String>,
    pub service_id: Option<String>,
    pub severity: Option<IncidentSeverity>,
    pub triggered_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIncidentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub service_id: Option<String>,
    pub severity: Option<IncidentSeverity>,
    pub triggered_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppendEventRequest {
    pub event_type: Option<IncidentEventType>,
    pub message: String,
    pub author: Option<String>,
}

pub async fn list_incidents(
    State(state): State<SharedState>,
    Query(params): Query<IncidentListParams>,
) -> Result<Json<Vec<Incident>>, ApiError> {
    let status = parse_filter::<IncidentStatus>(params.status.as_deref())?;
    let severity = parse_filter::<IncidentSeverity>(params.severity.as_deref())?;
    let incidents = state
        .db
        .list_incidents(status, severity, params.service_id.as_deref())?;
    Ok(Json(incidents))
}

pub async fn create_incident(
    State(state): State<SharedState>,
    Json(req): Json<CreateIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    let incident = state.db.create_incident(NewIncident {
        title: req.title,
        description: req.description,
        service_id: req.service_id,
        severity: req.severity.unwrap_or(IncidentSeverity::Medium),
        triggered_by: req.triggered_by,
    })?;

    tracing::info!(number = %incident.incident_number, "incident opened");
    Ok((StatusCode::CREATED, Json(incident)))
}

pub async fn update_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateIncidentRequest>,
) -> Result<Json<Incident>, ApiError> {
    let Some(mut incident) = state.db.get_incident(&id)? else {
        return Err(ApiError::NotFound("incident"));
    };

    if let Some(title) = req.title {
        incident.title = title;
    }
    if let Some(description) = req.description {
        incident.description = Some(description);
    }
    if let Some(service_id) = req.service_id {
        incident.service_id = Some(service_id);
    }
    if let Some(severity) = req.severity {
        incident.severity = severity;
    }
    if let Some(triggered_by) = req.triggered_by {
        incident.triggered_by = Some(triggered_by);
    }
    incident.updated_at = Utc::now();

    if !state.db.update_incident(&incident)? {
        return Err(ApiError::NotFound("incident"));
    }
    Ok(Json(incident))
}

fn apply_transition(
    state: &SharedState,
    id: &str,
    action: IncidentAction,
    action_name: &'static str,
) -> Result<Json<Incident>, ApiError> {
    match state.db.transition_incident(id, action)? {
        TransitionOutcome::Done(incident) => {
            tracing::info!(number = %incident.incident_number, action = action_name, "incident transition");
            Ok(Json(incident))
        }
        TransitionOutcome::NotFound => Err(ApiError::NotFound("incident")),
        TransitionOutcome::Invalid(from) => Err(ApiError::InvalidTransition {
            action: action_name,
            from,
        }),
    }
}

pub async fn acknowledge_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Incident>, ApiError> {
    apply_transition(&state, &id, IncidentAction::Acknowledge, "acknowledge")
}

pub async fn resolve_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Incident>, ApiError> {
    apply_transition(&state, &id, IncidentAction::Resolve, "resolve")
}

pub async fn list_incident_events(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<IncidentEvent>>, ApiError> {
    if !state.db.incident_exists(&id)? {
        return Err(ApiError::NotFound("incident"));
    }
    let events = state.db.list_incident_events(&id)?;
    Ok(Json(events))
}

pub async fn append_incident_event(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<AppendEventRequest>,
) -> Result<(StatusCode, Json<IncidentEvent>), ApiError> {
    if !state.db.incident_exists(&id)? {
        return Err(ApiError::NotFound("incident"));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }

    let event = IncidentEvent {
        id: uuid::Uuid::new_v4().to_string(),
        incident_id: id,
        event_type: req.event_type.unwrap_or(IncidentEventType::Comment),
        message: req.message,
        author: req.author,
        created_at: Utc::now(),
    };
    state.db.append_incident_event(&event)?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn delete_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.db.delete_incident(&id)? {
        return Err(ApiError::NotFound("incident"));
    }
    tracing::info!(%id, "deleted incident");
    Ok(Json(json!({ "success": true })))
}
