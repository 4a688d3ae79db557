//! Release-validation endpoint. Each check queries the store
//! independently so one failing query degrades a single check rather
//! than aborting the whole report.

use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;

use opsdeck_core::validation::{
    self, ValidationCheck, ValidationReport, ERROR_LOG_WINDOW_MINUTES,
};
use opsdeck_core::AlertSeverity;

use crate::error::ApiError;
use crate::routes::SharedState;

const DEFAULT_ENVIRONMENT: &str = "staging";

#[derive(Debug, Default, Deserialize)]
pub struct RunValidationRequest {
    pub environment: Option<String>,
}

pub async fn run_validation(
    State(state): State<SharedState>,
    body: Option<Json<RunValidationRequest>>,
) -> Result<Json<ValidationReport>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let environment = request
        .environment
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let mut checks = Vec::with_capacity(6);

    checks.push(match state.db.list_services() {
        Ok(services) => validation::check_services_health(&services),
        Err(e) => ValidationCheck::query_failed("Services Health", "services", &e.to_string()),
    });

    checks.push(
        match state
            .db
            .list_alerts(Some(AlertSeverity::Critical), Some(true), None)
        {
            Ok(alerts) => validation::check_critical_alerts(&alerts),
            Err(e) => ValidationCheck::query_failed("Critical Alerts", "alerts", &e.to_string()),
        },
    );

    checks.push(match state.db.list_open_high_incidents() {
        Ok(incidents) => validation::check_open_incidents(&incidents),
        Err(e) => ValidationCheck::query_failed("Open Incidents", "incidents", &e.to_string()),
    });

    checks.push(match state.db.list_slos(None, None) {
        Ok(slos) => validation::check_slo_health(&slos),
        Err(e) => ValidationCheck::query_failed("SLO Health", "slos", &e.to_string()),
    });

    // Re-queried rather than reused from check 1: the checks are
    // independent by contract.
    checks.push(match state.db.list_services() {
        Ok(services) => validation::check_error_rates(&services),
        Err(e) => ValidationCheck::query_failed("Error Rates", "services", &e.to_string()),
    });

    let cutoff = Utc::now() - Duration::minutes(ERROR_LOG_WINDOW_MINUTES);
    checks.push(match state.db.count_error_logs_since(cutoff) {
        Ok(count) => validation::check_error_logs(count),
        Err(e) => ValidationCheck::query_failed("Error Logs", "logs", &e.to_string()),
    });

    let report = validation::build_report(&environment, checks);
    tracing::info!(
        environment = %report.environment,
        passed = report.passed,
        failed = report.summary.failed,
        warnings = report.summary.warnings,
        "validation run complete"
    );
    Ok(Json(report))
}
