//! Incident workflow against the real store: monotonic numbering,
//! guarded transitions, and the append-only event trail.

use opsdeck_core::{IncidentEventType, IncidentSeverity, IncidentStatus};
use opsdeck_server::db::{IncidentAction, NewIncident, TransitionOutcome};
use opsdeck_server::Database;

fn new_incident(title: &str, severity: IncidentSeverity) -> NewIncident {
    NewIncident {
        title: title.to_string(),
        description: None,
        service_id: None,
        severity,
        triggered_by: Some("monitor".to_string()),
    }
}

#[test]
fn creation_opens_incident_with_triggered_event() {
    let db = Database::open_in_memory().unwrap();
    let incident = db
        .create_incident(new_incident("Checkout errors spiking", IncidentSeverity::High))
        .unwrap();

    assert_eq!(incident.status, IncidentStatus::Open);
    assert!(incident.incident_number.starts_with("INC-"));
    assert!(incident.incident_number.ends_with("-001"));

    let events = db.list_incident_events(&incident.id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, IncidentEventType::Triggered);
    assert_eq!(
        events[0].message,
        "Incident created: Checkout errors spiking"
    );
}

#[test]
fn incident_numbers_increase_within_the_day() {
    let db = Database::open_in_memory().unwrap();
    let first = db
        .create_incident(new_incident("first", IncidentSeverity::Low))
        .unwrap();
    let second = db
        .create_incident(new_incident("second", IncidentSeverity::Low))
        .unwrap();
    let third = db
        .create_incident(new_incident("third", IncidentSeverity::Low))
        .unwrap();

    assert!(first.incident_number < second.incident_number);
    assert!(second.incident_number < third.incident_number);
    assert!(third.incident_number.ends_with("-003"));
}

#[test]
fn full_workflow_leaves_ordered_event_trail() {
    let db = Database::open_in_memory().unwrap();
    let incident = db
        .create_incident(new_incident("Database failover", IncidentSeverity::Critical))
        .unwrap();

    let acked = match db
        .transition_incident(&incident.id, IncidentAction::Acknowledge)
        .unwrap()
    {
        TransitionOutcome::Done(i) => i,
        other => panic!("expected Done, got {:?}", other),
    };
    assert_eq!(acked.status, IncidentStatus::Ongoing);
    assert!(acked.acknowledged_at.is_some());

    let resolved = match db
        .transition_incident(&incident.id, IncidentAction::Resolve)
        .unwrap()
    {
        TransitionOutcome::Done(i) => i,
        other => panic!("expected Done, got {:?}", other),
    };
    assert_eq!(resolved.status, IncidentStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    let events = db.list_incident_events(&incident.id).unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            IncidentEventType::Triggered,
            IncidentEventType::Acknowledged,
            IncidentEventType::Resolved,
        ]
    );
}

#[test]
fn repeated_acknowledge_is_rejected_without_new_events() {
    let db = Database::open_in_memory().unwrap();
    let incident = db
        .create_incident(new_incident("Flapping health check", IncidentSeverity::Medium))
        .unwrap();

    db.transition_incident(&incident.id, IncidentAction::Acknowledge)
        .unwrap();
    let outcome = db
        .transition_incident(&incident.id, IncidentAction::Acknowledge)
        .unwrap();
    match outcome {
        TransitionOutcome::Invalid(status) => assert_eq!(status, IncidentStatus::Ongoing),
        other => panic!("expected Invalid, got {:?}", other),
    }

    // Trail still holds exactly one acknowledgement.
    let events = db.list_incident_events(&incident.id).unwrap();
    assert_eq!(events.len(), 2);
}

#[test]
fn resolved_incidents_are_terminal() {
    let db = Database::open_in_memory().unwrap();
    let incident = db
        .create_incident(new_incident("Brief outage", IncidentSeverity::Low))
        .unwrap();

    // Skip straight from OPEN to RESOLVED.
    db.transition_incident(&incident.id, IncidentAction::Resolve)
        .unwrap();

    for action in [IncidentAction::Acknowledge, IncidentAction::Resolve] {
        match db.transition_incident(&incident.id, action).unwrap() {
            TransitionOutcome::Invalid(status) => {
                assert_eq!(status, IncidentStatus::Resolved)
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }
}

#[test]
fn transitions_on_unknown_incidents_report_not_found() {
    let db = Database::open_in_memory().unwrap();
    match db
        .transition_incident("missing", IncidentAction::Acknowledge)
        .unwrap()
    {
        TransitionOutcome::NotFound => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn numbering_survives_a_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("opsdeck.db");

    {
        let db = Database::open(&path).unwrap();
        db.create_incident(new_incident("before restart", IncidentSeverity::Low))
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let incident = db
        .create_incident(new_incident("after restart", IncidentSeverity::Low))
        .unwrap();
    assert!(incident.incident_number.ends_with("-002"));
    assert_eq!(db.list_incidents(None, None, None).unwrap().len(), 2);
}

#[test]
fn deleting_an_incident_removes_its_events() {
    let db = Database::open_in_memory().unwrap();
    let incident = db
        .create_incident(new_incident("To be deleted", IncidentSeverity::Low))
        .unwrap();

    assert!(db.delete_incident(&incident.id).unwrap());
    assert!(db.get_incident(&incident.id).unwrap().is_none());
    assert!(db.list_incident_events(&incident.id).unwrap().is_empty());
}
