//! Domain model and derived-state evaluation for the opsdeck dashboard.
//!
//! Everything in this crate is pure: entity types, lifecycle rules,
//! the health-score evaluator and the release-validation checks. All
//! I/O (storage, HTTP) lives in the server crate.

pub mod alert;
pub mod evaluator;
pub mod incident;
pub mod service;
pub mod slo;
pub mod telemetry;
pub mod validation;

pub use alert::{Alert, AlertSeverity};
pub use evaluator::{
    health_score, overall_status, AlertStats, HealthStats, IncidentStats, OverallStatus,
    ServiceStats, SloStats,
};
pub use incident::{
    Incident, IncidentEvent, IncidentEventType, IncidentSeverity, IncidentStatus,
};
pub use service::{Service, ServiceStatus};
pub use slo::Slo;
pub use telemetry::{LogEntry, LogLevel, MetricSample};

/// Error returned when a wire string does not name a known enum variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
