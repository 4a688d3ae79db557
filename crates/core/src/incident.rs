use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentSeverity::Low => "LOW",
            IncidentSeverity::Medium => "MEDIUM",
            IncidentSeverity::High => "HIGH",
            IncidentSeverity::Critical => "CRITICAL",
        }
    }
}

impl FromStr for IncidentSeverity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(IncidentSeverity::Low),
            "MEDIUM" => Ok(IncidentSeverity::Medium),
            "HIGH" => Ok(IncidentSeverity::High),
            "CRITICAL" => Ok(IncidentSeverity::Critical),
            other => Err(ParseEnumError::new("incident severity", other)),
        }
    }
}

/// Strict forward state machine: OPEN -> ONGOING -> RESOLVED, with
/// OPEN -> RESOLVED allowed as a skip. Nothing transitions out of
/// RESOLVED (no reopening).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Ongoing,
    Resolved,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "OPEN",
            IncidentStatus::Ongoing => "ONGOING",
            IncidentStatus::Resolved => "RESOLVED",
        }
    }

    pub fn can_transition_to(&self, next: IncidentStatus) -> bool {
        matches!(
            (self, next),
            (IncidentStatus::Open, IncidentStatus::Ongoing)
                | (IncidentStatus::Open, IncidentStatus::Resolved)
                | (IncidentStatus::Ongoing, IncidentStatus::Resolved)
        )
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, IncidentStatus::Resolved)
    }
}

impl FromStr for IncidentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(IncidentStatus::Open),
            "ONGOING" => Ok(IncidentStatus::Ongoing),
            "RESOLVED" => Ok(IncidentStatus::Resolved),
            other => Err(ParseEnumError::new("incident status", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentEventType {
    Triggered,
    Acknowledged,
    Escalated,
    Resolved,
    Comment,
}

impl IncidentEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentEventType::Triggered => "triggered",
            IncidentEventType::Acknowledged => "acknowledged",
            IncidentEventType::Escalated => "escalated",
            IncidentEventType::Resolved => "resolved",
            IncidentEventType::Comment => "comment",
        }
    }
}

impl FromStr for IncidentEventType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triggered" => Ok(IncidentEventType::Triggered),
            "acknowledged" => Ok(IncidentEventType::Acknowledged),
            "escalated" => Ok(IncidentEventType::Escalated),
            "resolved" => Ok(IncidentEventType::Resolved),
            "comment" => Ok(IncidentEventType::Comment),
            other => Err(ParseEnumError::new("incident event type", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub incident_number: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the append-only audit trail attached to an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub id: String,
    pub incident_id: String,
    pub event_type: IncidentEventType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `INC-YYYYMMDD-` for the given day; the store allocates suffixes
/// monotonically under this prefix.
pub fn incident_number_prefix(date: NaiveDate) -> String {
    format!("INC-{}-", date.format("%Y%m%d"))
}

/// Render an incident number. The sequence is zero-padded to three
/// digits but allowed to grow wider on very busy days.
pub fn format_incident_number(date: NaiveDate, seq: u32) -> String {
    format!("{}{:03}", incident_number_prefix(date), seq)
}

/// Extract the numeric suffix from an incident number under the given
/// day prefix. Foreign or malformed numbers yield `None`.
pub fn parse_incident_seq(number: &str, prefix: &str) -> Option<u32> {
    number.strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_transitions_are_allowed() {
        use IncidentStatus::*;
        assert!(Open.can_transition_to(Ongoing));
        assert!(Open.can_transition_to(Resolved));
        assert!(Ongoing.can_transition_to(Resolved));

        assert!(!Ongoing.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(Ongoing));
        assert!(!Resolved.can_transition_to(Resolved));
        assert!(!Open.can_transition_to(Open));
    }

    #[test]
    fn incident_numbers_are_daily_and_monotonic_friendly() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let prefix = incident_number_prefix(date);
        assert_eq!(prefix, "INC-20260829-");

        assert_eq!(format_incident_number(date, 7), "INC-20260829-007");
        assert_eq!(format_incident_number(date, 1042), "INC-20260829-1042");

        assert_eq!(parse_incident_seq("INC-20260829-007", &prefix), Some(7));
        assert_eq!(parse_incident_seq("INC-20260829-1042", &prefix), Some(1042));
        assert_eq!(parse_incident_seq("INC-20260828-001", &prefix), None);
        assert_eq!(parse_incident_seq("INC-20260829-xyz", &prefix), None);
    }
}
