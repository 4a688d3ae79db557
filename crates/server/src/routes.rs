//! Router assembly and shared application state.

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use opsdeck_core::ParseEnumError;

use crate::db::Database;
use crate::error::ApiError;
use crate::{
    alerts_api, health_api, incidents_api, seed, services_api, slos_api, telemetry_api,
    validation_api,
};

pub struct AppState {
    pub db: Database,
}

pub type SharedState = Arc<AppState>;

/// Parse an optional query-string value into one of the wire enums,
/// turning unknown values into a 400 instead of a silent no-match.
pub(crate) fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .map(|v| v.parse::<T>().map_err(|e| ApiError::BadRequest(e.to_string())))
        .transpose()
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(liveness))
        // Services
        .route(
            "/api/services",
            get(services_api::list_services).post(services_api::create_service),
        )
        .route(
            "/api/services/:id",
            get(services_api::get_service)
                .put(services_api::update_service)
                .delete(services_api::delete_service),
        )
        // Alerts
        .route(
            "/api/alerts",
            get(alerts_api::list_alerts).post(alerts_api::create_alert),
        )
        .route(
            "/api/alerts/:id",
            put(alerts_api::update_alert).delete(alerts_api::delete_alert),
        )
        .route("/api/alerts/:id/acknowledge", post(alerts_api::acknowledge_alert))
        .route("/api/alerts/:id/silence", post(alerts_api::silence_alert))
        .route("/api/alerts/:id/resolve", post(alerts_api::resolve_alert))
        // Incidents
        .route(
            "/api/incidents",
            get(incidents_api::list_incidents).post(incidents_api::create_incident),
        )
        .route(
            "/api/incidents/:id",
            put(incidents_api::update_incident).delete(incidents_api::delete_incident),
        )
        .route(
            "/api/incidents/:id/acknowledge",
            post(incidents_api::acknowledge_incident),
        )
        .route(
            "/api/incidents/:id/resolve",
            post(incidents_api::resolve_incident),
        )
        .route(
            "/api/incidents/:id/events",
            get(incidents_api::list_incident_events).post(incidents_api::append_incident_event),
        )
        // SLOs
        .route(
            "/api/slos",
            get(slos_api::list_slos).post(slos_api::create_slo),
        )
        .route(
            "/api/slos/:id",
            put(slos_api::update_slo).delete(slos_api::delete_slo),
        )
        // Logs & metrics
        .route(
            "/api/logs",
            get(telemetry_api::list_logs)
                .post(telemetry_api::ingest_logs)
                .delete(telemetry_api::clear_logs),
        )
        .route(
            "/api/metrics",
            get(telemetry_api::list_metrics).post(telemetry_api::ingest_metrics),
        )
        // Health & validation
        .route("/api/health", get(health_api::system_health))
        .route("/api/validation/run", post(validation_api::run_validation))
        .route("/api/validation/seed", post(seed::generate_test_activity))
        .layer(cors)
        .with_state(state)
}
