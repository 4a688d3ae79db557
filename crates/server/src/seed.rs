//! Demo-data generator behind the validation seed endpoint. Inserts a
//! small burst of synthetic telemetry, creating a few baseline
//! services first when the store is empty.

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;
use uuid::Uuid;

use opsdeck_core::{LogEntry, LogLevel, MetricSample, Service, ServiceStatus};

use crate::error::ApiError;
use crate::routes::SharedState;

const METRIC_NAMES: [&str; 3] = ["cpu_usage", "memory_usage", "latency_p50"];
const LOG_LEVELS: [LogLevel; 5] = [
    LogLevel::Info,
    LogLevel::Info,
    LogLevel::Info,
    LogLevel::Warn,
    LogLevel::Debug,
];

fn baseline_service(name: &str, display_name: &str, uptime: f64) -> Service {
    let now = Utc::now();
    Service {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: None,
        status: ServiceStatus::Healthy,
        uptime,
        latency_p50: 0.0,
        latency_p99: 0.0,
        error_rate: 0.0,
        cpu_usage: 0.0,
        memory_usage: 0.0,
        requests_per_second: 0.0,
        created_at: now,
        updated_at: now,
        last_checked_at: Some(now),
    }
}

pub async fn generate_test_activity(
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut services = state.db.list_services()?;
    let mut created_services = 0usize;

    if services.is_empty() {
        for (name, display, uptime) in [
            ("api-gateway", "API Gateway", 99.95),
            ("auth-service", "Auth Service", 99.99),
            ("payment-service", "Payment Service", 99.90),
        ] {
            let service = baseline_service(name, display, uptime);
            state.db.insert_service(&service)?;
            services.push(service);
            created_services += 1;
        }
    }

    let service_ids: Vec<&str> = services.iter().take(3).map(|s| s.id.as_str()).collect();
    let now = Utc::now();
    let mut rng = rand::thread_rng();

    let metrics: Vec<MetricSample> = (0..10)
        .map(|i| MetricSample {
            id: Uuid::new_v4().to_string(),
            service_id: Some(service_ids[i % service_ids.len()].to_string()),
            metric_name: METRIC_NAMES[i % METRIC_NAMES.len()].to_string(),
            value: rng.gen::<f64>() * 100.0,
            unit: None,
            recorded_at: now - Duration::seconds(60 * i as i64),
        })
        .collect();
    state.db.insert_metrics(&metrics)?;

    let logs: Vec<LogEntry> = LOG_LEVELS
        .iter()
        .enumerate()
        .map(|(i, level)| LogEntry {
            id: Uuid::new_v4().to_string(),
            service_id: Some(service_ids[i % service_ids.len()].to_string()),
            level: *level,
            message: format!("Test activity generated at {}", now.to_rfc3339()),
            trace_id: None,
            metadata: None,
            created_at: now,
        })
        .collect();
    state.db.insert_logs(&logs)?;

    tracing::info!(
        services = created_services,
        metrics = metrics.len(),
        logs = logs.len(),
        "seeded test activity"
    );

    Ok(Json(json!({
        "success": true,
        "generated": {
            "services": created_services,
            "metrics": metrics.len(),
            "logs": logs.len(),
            "alerts": 0,
            "incidents": 0,
        }
    })))
}
