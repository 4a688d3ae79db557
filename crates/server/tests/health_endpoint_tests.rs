//! System-health endpoint exercised end to end against the real
//! store: derived stats, score, classifier tier and the component
//! booleans, all through the handler itself.

use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use uuid::Uuid;

use opsdeck_core::{Alert, AlertSeverity, IncidentSeverity, Service, ServiceStatus};
use opsdeck_server::db::NewIncident;
use opsdeck_server::{health_api, AppState, Database, SharedState};

fn test_state() -> SharedState {
    Arc::new(AppState {
        db: Database::open_in_memory().unwrap(),
    })
}

fn service(name: &str, status: ServiceStatus) -> Service {
    let now = Utc::now();
    Service {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        display_name: name.to_string(),
        description: None,
        status,
        uptime: 99.9,
        latency_p50: 40.0,
        latency_p99: 180.0,
        error_rate: 0.5,
        cpu_usage: 20.0,
        memory_usage: 30.0,
        requests_per_second: 100.0,
        created_at: now,
        updated_at: now,
        last_checked_at: None,
    }
}

fn critical_alert(title: &str) -> Alert {
    let now = Utc::now();
    Alert {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        name: None,
        service_id: None,
        severity: AlertSeverity::Critical,
        message: None,
        metric_name: None,
        threshold: None,
        current_value: None,
        is_active: true,
        fired_at: now,
        acknowledged_at: None,
        silenced_until: None,
        resolved_at: None,
        created_at: now,
    }
}

#[tokio::test]
async fn empty_system_reports_healthy_with_full_score() {
    let state = test_state();
    let body = health_api::system_health(State(state)).await.unwrap().0;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["score"], 100.0);
    assert_eq!(body["components"]["database"], true);
    assert_eq!(body["components"]["api"], true);
    assert_eq!(body["stats"]["services"]["total"], 0);
}

#[tokio::test]
async fn acknowledged_alert_drops_out_of_the_active_count() {
    let state = test_state();
    state.db.insert_alert(&critical_alert("crit-1")).unwrap();
    let acked = critical_alert("crit-2");
    state.db.insert_alert(&acked).unwrap();
    state.db.acknowledge_alert(&acked.id).unwrap().unwrap();

    let body = health_api::system_health(State(state)).await.unwrap().0;

    // Both alerts are stored, only the unacknowledged one counts.
    assert_eq!(body["stats"]["alerts"]["total"], 2);
    assert_eq!(body["stats"]["alerts"]["active"], 1);
    assert_eq!(body["stats"]["alerts"]["critical"], 1);

    // One critical alert: 100 - 10, degraded tier.
    assert_eq!(body["score"], 90.0);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn open_critical_incident_forces_unhealthy() {
    let state = test_state();
    state
        .db
        .insert_service(&service("api", ServiceStatus::Healthy))
        .unwrap();
    state
        .db
        .insert_service(&service("worker", ServiceStatus::Down))
        .unwrap();
    let incident = state
        .db
        .create_incident(NewIncident {
            title: "Worker outage".to_string(),
            description: None,
            service_id: None,
            severity: IncidentSeverity::Critical,
            triggered_by: None,
        })
        .unwrap();

    let body = health_api::system_health(State(Arc::clone(&state)))
        .await
        .unwrap()
        .0;
    assert_eq!(body["stats"]["services"]["down"], 1);
    assert_eq!(body["stats"]["incidents"]["open"], 1);
    assert_eq!(body["stats"]["incidents"]["critical"], 1);
    assert_eq!(body["status"], "unhealthy");

    // Resolving the incident and reviving the service recovers the tier.
    state
        .db
        .transition_incident(&incident.id, opsdeck_server::db::IncidentAction::Resolve)
        .unwrap();
    let mut worker = state
        .db
        .list_services()
        .unwrap()
        .into_iter()
        .find(|s| s.name == "worker")
        .unwrap();
    worker.status = ServiceStatus::Healthy;
    state.db.update_service(&worker).unwrap();

    let body = health_api::system_health(State(state)).await.unwrap().0;
    assert_eq!(body["stats"]["incidents"]["open"], 0);
    assert_eq!(body["status"], "healthy");
}
