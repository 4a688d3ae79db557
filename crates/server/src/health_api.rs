//! Derived system-health endpoint. Nothing here is stored; the stats,
//! score, and overall status are computed from current rows on every
//! request.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use opsdeck_core::{
    health_score, overall_status, AlertSeverity, AlertStats, HealthStats, IncidentSeverity,
    IncidentStats, ServiceStats, ServiceStatus, SloStats,
};

use crate::error::ApiError;
use crate::routes::SharedState;

pub async fn system_health(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let database_ok = state.db.ping();
    let now = Utc::now();

    let services = state.db.list_services()?;
    let alerts = state.db.list_alerts(None, None, None)?;
    let incidents = state.db.list_incidents(None, None, None)?;
    let slos = state.db.list_slos(None, None)?;

    let effectively_active: Vec<_> = alerts
        .iter()
        .filter(|a| a.is_effectively_active(now))
        .collect();

    let stats = HealthStats {
        services: ServiceStats {
            total: services.len(),
            healthy: services
                .iter()
                .filter(|s| s.status == ServiceStatus::Healthy)
                .count(),
            degraded: services
                .iter()
                .filter(|s| s.status == ServiceStatus::Degraded)
                .count(),
            down: services
                .iter()
                .filter(|s| s.status == ServiceStatus::Down)
                .count(),
        },
        alerts: AlertStats {
            total: alerts.len(),
            active: effectively_active.len(),
            critical: effectively_active
                .iter()
                .filter(|a| a.severity == AlertSeverity::Critical)
                .count(),
            warning: effectively_active
                .iter()
                .filter(|a| a.severity == AlertSeverity::Warning)
                .count(),
        },
        incidents: IncidentStats {
            total: incidents.len(),
            open: incidents.iter().filter(|i| i.status.is_open()).count(),
            critical: incidents
                .iter()
                .filter(|i| i.status.is_open() && i.severity == IncidentSeverity::Critical)
                .count(),
        },
        slos: SloStats {
            total: slos.len(),
            breaching: slos.iter().filter(|s| s.is_breaching).count(),
            budget_exhausted: slos.iter().filter(|s| s.is_budget_exhausted).count(),
        },
    };

    let score = health_score(&stats);
    let status = overall_status(score, &stats);

    Ok(Json(json!({
        "status": status,
        "score": score.round(),
        "timestamp": now.to_rfc3339(),
        "components": {
            "database": database_ok,
            "api": true,
        },
        "stats": stats,
    })))
}
