//! Release-validation checks. Each check is a pure function over a
//! snapshot of rows; the server runs the six queries and feeds the
//! results in here. A query failure is represented as a failed check
//! by the caller so the remaining checks still run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Alert, Incident, Service, ServiceStatus, Slo};

/// Services with an error rate above this percentage fail the
/// error-rate check.
pub const ERROR_RATE_FAIL_THRESHOLD: f64 = 5.0;
/// More ERROR logs than this inside the trailing window raises a
/// warning.
pub const ERROR_LOG_WARN_THRESHOLD: i64 = 50;
/// Trailing window for the error-log check, in minutes.
pub const ERROR_LOG_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Failed,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationCheck {
    fn passed(name: &str, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Passed,
            message,
            details,
        }
    }

    fn failed(name: &str, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Failed,
            message,
            details,
        }
    }

    fn warning(name: &str, message: String, details: Option<serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message,
            details,
        }
    }

    /// A check whose backing query failed. The query error becomes the
    /// check message; the rest of the report is unaffected.
    pub fn query_failed(name: &str, resource: &str, error: &str) -> Self {
        Self::failed(name, format!("Failed to fetch {resource}: {error}"), None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub timestamp: DateTime<Utc>,
    pub environment: String,
    pub checks: Vec<ValidationCheck>,
    pub summary: ValidationSummary,
}

/// Check 1: fail on any down service, warn when none are configured.
pub fn check_services_health(services: &[Service]) -> ValidationCheck {
    let name = "Services Health";
    let total = services.len();
    let healthy = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Healthy)
        .count();
    let down = services
        .iter()
        .filter(|s| s.status == ServiceStatus::Down)
        .count();

    if total == 0 {
        ValidationCheck::warning(
            name,
            "No services configured".to_string(),
            Some(json!({ "total": 0 })),
        )
    } else if down > 0 {
        ValidationCheck::failed(
            name,
            format!("{down} service(s) are down"),
            Some(json!({ "total": total, "healthy": healthy, "down": down })),
        )
    } else {
        ValidationCheck::passed(
            name,
            format!("All {total} services are operational"),
            Some(json!({ "total": total, "healthy": healthy })),
        )
    }
}

/// Check 2: fail on any stored-active CRITICAL alert. The caller
/// passes the already-filtered rows.
pub fn check_critical_alerts(critical_active: &[Alert]) -> ValidationCheck {
    let name = "Critical Alerts";
    let count = critical_active.len();
    if count > 0 {
        let titles: Vec<&str> = critical_active.iter().map(|a| a.title.as_str()).collect();
        ValidationCheck::failed(
            name,
            format!("{count} critical alert(s) active"),
            Some(json!({ "count": count, "alerts": titles })),
        )
    } else {
        ValidationCheck::passed(name, "No critical alerts active".to_string(), None)
    }
}

/// Check 3: fail on any open/ongoing incident at HIGH or CRITICAL
/// severity. The caller passes the already-filtered rows.
pub fn check_open_incidents(open_high: &[Incident]) -> ValidationCheck {
    let name = "Open Incidents";
    let count = open_high.len();
    if count > 0 {
        let titles: Vec<&str> = open_high.iter().map(|i| i.title.as_str()).collect();
        ValidationCheck::failed(
            name,
            format!("{count} high/critical incident(s) open"),
            Some(json!({ "count": count, "incidents": titles })),
        )
    } else {
        ValidationCheck::passed(name, "No high-severity incidents open".to_string(), None)
    }
}

/// Check 4: warn when no SLOs exist, fail on any breach or exhausted
/// budget.
pub fn check_slo_health(slos: &[Slo]) -> ValidationCheck {
    let name = "SLO Health";
    let total = slos.len();
    let breaching = slos.iter().filter(|s| s.is_breaching).count();
    let exhausted = slos.iter().filter(|s| s.is_budget_exhausted).count();

    if total == 0 {
        ValidationCheck::warning(
            name,
            "No SLOs configured".to_string(),
            Some(json!({ "total": 0 })),
        )
    } else if breaching > 0 || exhausted > 0 {
        ValidationCheck::failed(
            name,
            format!("{breaching} SLO(s) breaching, {exhausted} budget(s) exhausted"),
            Some(json!({ "total": total, "breaching": breaching, "exhausted": exhausted })),
        )
    } else {
        ValidationCheck::passed(
            name,
            format!("All {total} SLOs within targets"),
            Some(json!({ "total": total })),
        )
    }
}

/// Check 5: fail on any service whose error rate exceeds 5%.
pub fn check_error_rates(services: &[Service]) -> ValidationCheck {
    let name = "Error Rates";
    let offenders: Vec<&Service> = services
        .iter()
        .filter(|s| s.error_rate > ERROR_RATE_FAIL_THRESHOLD)
        .collect();

    if offenders.is_empty() {
        ValidationCheck::passed(
            name,
            "All services within acceptable error rates".to_string(),
            None,
        )
    } else {
        let details: Vec<serde_json::Value> = offenders
            .iter()
            .map(|s| json!({ "name": s.display_name, "rate": s.error_rate }))
            .collect();
        ValidationCheck::failed(
            name,
            format!("{} service(s) with error rate > 5%", offenders.len()),
            Some(json!({ "services": details })),
        )
    }
}

/// Check 6: warn when the trailing hour saw more than 50 ERROR logs.
pub fn check_error_logs(error_count_last_hour: i64) -> ValidationCheck {
    let name = "Error Logs";
    if error_count_last_hour > ERROR_LOG_WARN_THRESHOLD {
        ValidationCheck::warning(
            name,
            format!("{error_count_last_hour} error logs in the last hour"),
            Some(json!({ "count": error_count_last_hour })),
        )
    } else {
        ValidationCheck::passed(
            name,
            format!("Error log count within threshold ({error_count_last_hour}/{ERROR_LOG_WARN_THRESHOLD})"),
            None,
        )
    }
}

/// Tally the checks into the final report. Warnings never block:
/// `passed` is true exactly when no check failed.
pub fn build_report(environment: &str, checks: Vec<ValidationCheck>) -> ValidationReport {
    let summary = ValidationSummary {
        total: checks.len(),
        passed: checks
            .iter()
            .filter(|c| c.status == CheckStatus::Passed)
            .count(),
        failed: checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
            .count(),
        warnings: checks
            .iter()
            .filter(|c| c.status == CheckStatus::Warning)
            .count(),
    };

    ValidationReport {
        passed: summary.failed == 0,
        timestamp: Utc::now(),
        environment: environment.to_string(),
        checks,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str, status: ServiceStatus, error_rate: f64) -> Service {
        let now = Utc::now();
        Service {
            id: format!("svc-{name}"),
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            status,
            uptime: 99.9,
            latency_p50: 40.0,
            latency_p99: 200.0,
            error_rate,
            cpu_usage: 10.0,
            memory_usage: 20.0,
            requests_per_second: 5.0,
            created_at: now,
            updated_at: now,
            last_checked_at: None,
        }
    }

    #[test]
    fn empty_datastore_yields_two_warnings_and_still_passes() {
        let checks = vec![
            check_services_health(&[]),
            check_critical_alerts(&[]),
            check_open_incidents(&[]),
            check_slo_health(&[]),
            check_error_rates(&[]),
            check_error_logs(0),
        ];
        let report = build_report("staging", checks);

        assert_eq!(report.checks[0].status, CheckStatus::Warning);
        assert_eq!(report.checks[3].status, CheckStatus::Warning);
        for idx in [1, 2, 4, 5] {
            assert_eq!(report.checks[idx].status, CheckStatus::Passed);
        }
        assert!(report.passed, "warnings never block");
        assert_eq!(report.summary.total, 6);
        assert_eq!(report.summary.passed, 4);
        assert_eq!(report.summary.failed, 0);
        assert_eq!(report.summary.warnings, 2);
    }

    #[test]
    fn down_service_fails_with_counts_in_details() {
        let services = vec![
            service("api", ServiceStatus::Healthy, 0.2),
            service("db", ServiceStatus::Down, 0.0),
        ];
        let check = check_services_health(&services);
        assert_eq!(check.status, CheckStatus::Failed);
        let details = check.details.unwrap();
        assert_eq!(details["down"], 1);
        assert_eq!(details["total"], 2);
        assert_eq!(details["healthy"], 1);
    }

    #[test]
    fn high_error_rate_names_the_offender() {
        let services = vec![
            service("api", ServiceStatus::Healthy, 0.5),
            service("payments", ServiceStatus::Healthy, 7.3),
        ];
        let check = check_error_rates(&services);
        assert_eq!(check.status, CheckStatus::Failed);
        let details = check.details.unwrap();
        assert_eq!(details["services"][0]["name"], "payments");
    }

    #[test]
    fn error_log_threshold_is_exclusive() {
        assert_eq!(check_error_logs(50).status, CheckStatus::Passed);
        assert_eq!(check_error_logs(51).status, CheckStatus::Warning);
    }

    #[test]
    fn summary_always_adds_up_and_failures_block() {
        let checks = vec![
            check_services_health(&[service("api", ServiceStatus::Down, 0.0)]),
            check_critical_alerts(&[]),
            check_open_incidents(&[]),
            check_slo_health(&[]),
            check_error_rates(&[]),
            check_error_logs(120),
        ];
        let report = build_report("production", checks);
        assert!(!report.passed);
        assert_eq!(
            report.summary.total,
            report.summary.passed + report.summary.failed + report.summary.warnings
        );
    }

    #[test]
    fn query_failure_becomes_a_failed_check() {
        let check = ValidationCheck::query_failed("SLO Health", "SLOs", "disk I/O error");
        assert_eq!(check.status, CheckStatus::Failed);
        assert!(check.message.contains("disk I/O error"));
        assert!(check.details.is_none());
    }
}
