use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ParseEnumError;

/// Operational status reported for a monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Down,
    Unknown,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Down => "down",
            ServiceStatus::Unknown => "unknown",
        }
    }
}

impl FromStr for ServiceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(ServiceStatus::Healthy),
            "degraded" => Ok(ServiceStatus::Degraded),
            "down" => Ok(ServiceStatus::Down),
            "unknown" => Ok(ServiceStatus::Unknown),
            other => Err(ParseEnumError::new("service status", other)),
        }
    }
}

/// A monitored service with its point-in-time gauges. Gauges are
/// written by external monitoring or manual edits; nothing in this
/// system expires them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    /// Unique slug, e.g. `api-gateway`.
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: ServiceStatus,
    /// Percent over the reporting window.
    pub uptime: f64,
    pub latency_p50: f64,
    pub latency_p99: f64,
    /// Percent of requests failing.
    pub error_rate: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub requests_per_second: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_wire_strings() {
        for status in [
            ServiceStatus::Healthy,
            ServiceStatus::Degraded,
            ServiceStatus::Down,
            ServiceStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<ServiceStatus>().unwrap(), status);
        }
        assert!("offline".parse::<ServiceStatus>().is_err());
    }
}
