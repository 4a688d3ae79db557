//! Aggregate health evaluation: the weighted health score and the
//! three-tier overall-status classifier, computed from entity counts.

use serde::{Deserialize, Serialize};

/// Per-entity-group counts the score is computed from. Alert counts
/// are *effectively active* counts (acknowledged and silenced alerts
/// excluded), mirroring the display-counting invariant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStats {
    pub services: ServiceStats,
    pub alerts: AlertStats,
    pub incidents: IncidentStats,
    pub slos: SloStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub down: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    /// Effectively active: stored-active, unacknowledged, unsilenced.
    pub active: usize,
    pub critical: usize,
    pub warning: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentStats {
    pub total: usize,
    pub open: usize,
    /// Open incidents at CRITICAL severity (subset of `open`).
    pub critical: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SloStats {
    pub total: usize,
    pub breaching: usize,
    pub budget_exhausted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Healthy => "healthy",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Weighted deduction starting at 100, clamped to [0, 100].
pub fn health_score(stats: &HealthStats) -> f64 {
    let mut score = 100.0;

    if stats.services.total > 0 {
        let total = stats.services.total as f64;
        score -= (stats.services.down as f64 / total) * 40.0;
        score -= (stats.services.degraded as f64 / total) * 15.0;
    }

    score -= stats.alerts.critical as f64 * 10.0;
    score -= stats.alerts.warning as f64 * 3.0;

    score -= stats.incidents.critical as f64 * 15.0;
    score -= stats.incidents.open.saturating_sub(stats.incidents.critical) as f64 * 5.0;

    score -= stats.slos.breaching as f64 * 8.0;
    score -= stats.slos.budget_exhausted as f64 * 12.0;

    score.clamp(0.0, 100.0)
}

/// Three-tier classifier, evaluated worst-first so ties resolve
/// toward the worse status.
pub fn overall_status(score: f64, stats: &HealthStats) -> OverallStatus {
    if score < 50.0 || stats.incidents.critical > 0 || stats.services.down > 0 {
        OverallStatus::Unhealthy
    } else if score < 80.0 || stats.alerts.critical > 0 || stats.slos.breaching > 0 {
        OverallStatus::Degraded
    } else {
        OverallStatus::Healthy
    }
}
