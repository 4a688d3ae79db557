use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A service level objective with its rolling-window measurements.
///
/// `is_breaching` and `is_budget_exhausted` are derived columns: they
/// are recomputed from the source fields on every write (see
/// [`Slo::recompute_derived`]) and are never accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Target availability percent, e.g. 99.9.
    pub target_availability: f64,
    pub current_availability: f64,
    /// Target p99 latency in milliseconds.
    pub latency_target: f64,
    pub latency_current: f64,
    /// Error budget percentages over the rolling `period`.
    pub error_budget_total: f64,
    pub error_budget_consumed: f64,
    pub is_breaching: bool,
    pub is_budget_exhausted: bool,
    /// Rolling window label, e.g. `30d`.
    pub period: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Slo {
    /// Re-derive the two booleans from current source values. Called
    /// after every mutation that touches availability or budget
    /// fields so the stored flags can never drift.
    pub fn recompute_derived(&mut self) {
        self.is_breaching = self.current_availability < self.target_availability;
        self.is_budget_exhausted = self.error_budget_consumed >= self.error_budget_total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slo(current: f64, target: f64, consumed: f64, total: f64) -> Slo {
        let now = Utc::now();
        let mut slo = Slo {
            id: "s1".into(),
            name: "checkout availability".into(),
            service_id: None,
            target_availability: target,
            current_availability: current,
            latency_target: 200.0,
            latency_current: 180.0,
            error_budget_total: total,
            error_budget_consumed: consumed,
            is_breaching: false,
            is_budget_exhausted: false,
            period: "30d".into(),
            created_at: now,
            updated_at: now,
        };
        slo.recompute_derived();
        slo
    }

    #[test]
    fn breach_is_strictly_below_target() {
        assert!(slo(99.8, 99.9, 0.0, 0.1).is_breaching);
        assert!(!slo(99.9, 99.9, 0.0, 0.1).is_breaching);
        assert!(!slo(100.0, 99.9, 0.0, 0.1).is_breaching);
    }

    #[test]
    fn budget_exhaustion_includes_exactly_spent() {
        assert!(slo(100.0, 99.9, 0.1, 0.1).is_budget_exhausted);
        assert!(slo(100.0, 99.9, 0.2, 0.1).is_budget_exhausted);
        assert!(!slo(100.0, 99.9, 0.05, 0.1).is_budget_exhausted);
    }
}
