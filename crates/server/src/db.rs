// SQLite entity store for services, alerts, incidents, SLOs, logs and metrics.

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use opsdeck_core::incident::{format_incident_number, incident_number_prefix, parse_incident_seq};
use opsdeck_core::{
    Alert, AlertSeverity, Incident, IncidentEvent, IncidentEventType, IncidentSeverity,
    IncidentStatus, LogEntry, LogLevel, MetricSample, Service, Slo,
};

/// Upper bound on a silence window; one year. Values beyond this
/// would overflow `Duration::minutes`.
pub const MAX_SILENCE_MINUTES: i64 = 60 * 24 * 365;

/// Lifecycle action applied to an incident through the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentAction {
    Acknowledge,
    Resolve,
}

/// Result of a guarded incident transition. `Invalid` carries the
/// current status so the caller can report what blocked the move.
#[derive(Debug)]
pub enum TransitionOutcome {
    Done(Incident),
    NotFound,
    Invalid(IncidentStatus),
}

/// Fields accepted when opening a new incident; everything else
/// (number, status, timestamps) is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub title: String,
    pub description: Option<String>,
    pub service_id: Option<String>,
    pub severity: IncidentSeverity,
    pub triggered_by: Option<String>,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS services (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                uptime REAL NOT NULL,
                latency_p50 REAL NOT NULL,
                latency_p99 REAL NOT NULL,
                error_rate REAL NOT NULL,
                cpu_usage REAL NOT NULL,
                memory_usage REAL NOT NULL,
                requests_per_second REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                last_checked_at TEXT
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                name TEXT,
                service_id TEXT REFERENCES services(id) ON DELETE SET NULL,
                severity TEXT NOT NULL,
                message TEXT,
                metric_name TEXT,
                threshold REAL,
                current_value REAL,
                is_active INTEGER NOT NULL,
                fired_at TEXT NOT NULL,
                acknowledged_at TEXT,
                silenced_until TEXT,
                resolved_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                incident_number TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT,
                service_id TEXT REFERENCES services(id) ON DELETE SET NULL,
                severity TEXT NOT NULL,
                status TEXT NOT NULL,
                triggered_by TEXT,
                started_at TEXT NOT NULL,
                acknowledged_at TEXT,
                resolved_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS incident_events (
                id TEXT PRIMARY KEY,
                incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
                event_type TEXT NOT NULL,
                message TEXT NOT NULL,
                author TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS slos (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                service_id TEXT REFERENCES services(id) ON DELETE SET NULL,
                target_availability REAL NOT NULL,
                current_availability REAL NOT NULL,
                latency_target REAL NOT NULL,
                latency_current REAL NOT NULL,
                error_budget_total REAL NOT NULL,
                error_budget_consumed REAL NOT NULL,
                is_breaching INTEGER NOT NULL,
                is_budget_exhausted INTEGER NOT NULL,
                period TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS logs (
                id TEXT PRIMARY KEY,
                service_id TEXT REFERENCES services(id) ON DELETE SET NULL,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                trace_id TEXT,
                metadata TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metrics (
                id TEXT PRIMARY KEY,
                service_id TEXT REFERENCES services(id) ON DELETE SET NULL,
                metric_name TEXT NOT NULL,
                value REAL NOT NULL,
                unit TEXT,
                recorded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_created
                ON alerts(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_alerts_service
                ON alerts(service_id);
            CREATE INDEX IF NOT EXISTS idx_incidents_created
                ON incidents(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_incident_events_incident
                ON incident_events(incident_id);
            CREATE INDEX IF NOT EXISTS idx_logs_created
                ON logs(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_logs_level
                ON logs(level);
            CREATE INDEX IF NOT EXISTS idx_metrics_recorded
                ON metrics(recorded_at DESC);
            CREATE INDEX IF NOT EXISTS idx_metrics_name
                ON metrics(metric_name);
        "#,
        )?;
        Ok(())
    }

    /// Cheap connectivity probe for the health endpoint.
    pub fn ping(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0)).is_ok()
    }

    // ==========================================================================
    // Services
    // ==========================================================================

    pub fn insert_service(&self, service: &Service) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT INTO services
               (id, name, display_name, description, status, uptime, latency_p50,
                latency_p99, error_rate, cpu_usage, memory_usage, requests_per_second,
                created_at, updated_at, last_checked_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            params![
                service.id,
                service.name,
                service.display_name,
                service.description,
                service.status.as_str(),
                service.uptime,
                service.latency_p50,
                service.latency_p99,
                service.error_rate,
                service.cpu_usage,
                service.memory_usage,
                service.requests_per_second,
                service.created_at.to_rfc3339(),
                service.updated_at.to_rfc3339(),
                service.last_checked_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn get_service(&self, id: &str) -> Result<Option<Service>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_service(row)?)),
            None => Ok(None),
        }
    }

    /// Services come back alphabetical by slug; every other table is
    /// reverse chronological.
    pub fn list_services(&self) -> Result<Vec<Service>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM services ORDER BY name ASC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut services = Vec::new();
        while let Some(row) = rows.next()? {
            services.push(row_to_service(row)?);
        }
        Ok(services)
    }

    pub fn update_service(&self, service: &Service) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            r#"UPDATE services SET
               name = ?2, display_name = ?3, description = ?4, status = ?5, uptime = ?6,
               latency_p50 = ?7, latency_p99 = ?8, error_rate = ?9, cpu_usage = ?10,
               memory_usage = ?11, requests_per_second = ?12, updated_at = ?13,
               last_checked_at = ?14
               WHERE id = ?1"#,
            params![
                service.id,
                service.name,
                service.display_name,
                service.description,
                service.status.as_str(),
                service.uptime,
                service.latency_p50,
                service.latency_p99,
                service.error_rate,
                service.cpu_usage,
                service.memory_usage,
                service.requests_per_second,
                service.updated_at.to_rfc3339(),
                service.last_checked_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(count > 0)
    }

    pub fn delete_service(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }

    // ==========================================================================
    // Alerts
    // ==========================================================================

    pub fn insert_alert(&self, alert: &Alert) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT INTO alerts
               (id, title, name, service_id, severity, message, metric_name, threshold,
                current_value, is_active, fired_at, acknowledged_at, silenced_until,
                resolved_at, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            params![
                alert.id,
                alert.title,
                alert.name,
                alert.service_id,
                alert.severity.as_str(),
                alert.message,
                alert.metric_name,
                alert.threshold,
                alert.current_value,
                alert.is_active,
                alert.fired_at.to_rfc3339(),
                alert.acknowledged_at.map(|t| t.to_rfc3339()),
                alert.silenced_until.map(|t| t.to_rfc3339()),
                alert.resolved_at.map(|t| t.to_rfc3339()),
                alert.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_alert(&self, id: &str) -> Result<Option<Alert>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_alert(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_alerts(
        &self,
        severity: Option<AlertSeverity>,
        is_active: Option<bool>,
        service_id: Option<&str>,
    ) -> Result<Vec<Alert>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(sev) = severity {
            sql.push_str(" AND severity = ?");
            params_vec.push(Box::new(sev.as_str().to_string()));
        }
        if let Some(active) = is_active {
            sql.push_str(" AND is_active = ?");
            params_vec.push(Box::new(active));
        }
        if let Some(sid) = service_id {
            sql.push_str(" AND service_id = ?");
            params_vec.push(Box::new(sid.to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_refs.as_slice())?;
        let mut alerts = Vec::new();
        while let Some(row) = rows.next()? {
            alerts.push(row_to_alert(row)?);
        }
        Ok(alerts)
    }

    pub fn update_alert(&self, alert: &Alert) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            r#"UPDATE alerts SET
               title = ?2, name = ?3, service_id = ?4, severity = ?5, message = ?6,
               metric_name = ?7, threshold = ?8, current_value = ?9, is_active = ?10,
               acknowledged_at = ?11, silenced_until = ?12, resolved_at = ?13
               WHERE id = ?1"#,
            params![
                alert.id,
                alert.title,
                alert.name,
                alert.service_id,
                alert.severity.as_str(),
                alert.message,
                alert.metric_name,
                alert.threshold,
                alert.current_value,
                alert.is_active,
                alert.acknowledged_at.map(|t| t.to_rfc3339()),
                alert.silenced_until.map(|t| t.to_rfc3339()),
                alert.resolved_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(count > 0)
    }

    /// Sets `acknowledged_at` and nothing else: the alert stays
    /// stored-active, it just drops out of the effective count.
    pub fn acknowledge_alert(&self, id: &str) -> Result<Option<Alert>, rusqlite::Error> {
        let updated = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE alerts SET acknowledged_at = ?2 WHERE id = ?1",
                params![id, Utc::now().to_rfc3339()],
            )?
        };
        if updated == 0 {
            return Ok(None);
        }
        self.get_alert(id)
    }

    /// Stores the silence horizon; expiry is evaluated at read time,
    /// never written back. The window is clamped to
    /// [`MAX_SILENCE_MINUTES`].
    pub fn silence_alert(
        &self,
        id: &str,
        duration_minutes: i64,
    ) -> Result<Option<Alert>, rusqlite::Error> {
        let minutes = duration_minutes.clamp(1, MAX_SILENCE_MINUTES);
        let until = Utc::now() + Duration::minutes(minutes);
        let updated = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE alerts SET silenced_until = ?2 WHERE id = ?1",
                params![id, until.to_rfc3339()],
            )?
        };
        if updated == 0 {
            return Ok(None);
        }
        self.get_alert(id)
    }

    pub fn resolve_alert(&self, id: &str) -> Result<Option<Alert>, rusqlite::Error> {
        let updated = {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE alerts SET is_active = 0, resolved_at = ?2 WHERE id = ?1",
                params![id, Utc::now().to_rfc3339()],
            )?
        };
        if updated == 0 {
            return Ok(None);
        }
        self.get_alert(id)
    }

    pub fn delete_alert(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute("DELETE FROM alerts WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }

    // ==========================================================================
    // Incidents
    // ==========================================================================

    /// Opens an incident. The incident row, its sequential number and
    /// the `triggered` audit event are committed in one transaction:
    /// an incident can never exist without its initiating event.
    pub fn create_incident(&self, new: NewIncident) -> Result<Incident, rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let now = Utc::now();
        let prefix = incident_number_prefix(now.date_naive());
        let next_seq = {
            let mut stmt =
                tx.prepare("SELECT incident_number FROM incidents WHERE incident_number LIKE ?1")?;
            let mut rows = stmt.query(params![format!("{prefix}%")])?;
            let mut max_seq = 0u32;
            while let Some(row) = rows.next()? {
                let number: String = row.get(0)?;
                if let Some(seq) = parse_incident_seq(&number, &prefix) {
                    max_seq = max_seq.max(seq);
                }
            }
            max_seq + 1
        };

        let incident = Incident {
            id: uuid::Uuid::new_v4().to_string(),
            incident_number: format_incident_number(now.date_naive(), next_seq),
            title: new.title,
            description: new.description,
            service_id: new.service_id,
            severity: new.severity,
            status: IncidentStatus::Open,
            triggered_by: new.triggered_by,
            started_at: now,
            acknowledged_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            r#"INSERT INTO incidents
               (id, incident_number, title, description, service_id, severity, status,
                triggered_by, started_at, acknowledged_at, resolved_at, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
            params![
                incident.id,
                incident.incident_number,
                incident.title,
                incident.description,
                incident.service_id,
                incident.severity.as_str(),
                incident.status.as_str(),
                incident.triggered_by,
                incident.started_at.to_rfc3339(),
                Option::<String>::None,
                Option::<String>::None,
                incident.created_at.to_rfc3339(),
                incident.updated_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            r#"INSERT INTO incident_events (id, incident_id, event_type, message, author, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                uuid::Uuid::new_v4().to_string(),
                incident.id,
                IncidentEventType::Triggered.as_str(),
                format!("Incident created: {}", incident.title),
                Option::<String>::None,
                now.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        Ok(incident)
    }

    pub fn get_incident(&self, id: &str) -> Result<Option<Incident>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_incident(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_incidents(
        &self,
        status: Option<IncidentStatus>,
        severity: Option<IncidentSeverity>,
        service_id: Option<&str>,
    ) -> Result<Vec<Incident>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(st) = status {
            sql.push_str(" AND status = ?");
            params_vec.push(Box::new(st.as_str().to_string()));
        }
        if let Some(sev) = severity {
            sql.push_str(" AND severity = ?");
            params_vec.push(Box::new(sev.as_str().to_string()));
        }
        if let Some(sid) = service_id {
            sql.push_str(" AND service_id = ?");
            params_vec.push(Box::new(sid.to_string()));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_refs.as_slice())?;
        let mut incidents = Vec::new();
        while let Some(row) = rows.next()? {
            incidents.push(row_to_incident(row)?);
        }
        Ok(incidents)
    }

    /// Open or ongoing incidents at HIGH/CRITICAL severity, for the
    /// release-validation report.
    pub fn list_open_high_incidents(&self) -> Result<Vec<Incident>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents
             WHERE status IN ('OPEN', 'ONGOING') AND severity IN ('HIGH', 'CRITICAL')
             ORDER BY created_at DESC"
        ))?;
        let mut rows = stmt.query([])?;
        let mut incidents = Vec::new();
        while let Some(row) = rows.next()? {
            incidents.push(row_to_incident(row)?);
        }
        Ok(incidents)
    }

    /// General field update; status is deliberately not touchable here,
    /// only through [`Database::transition_incident`].
    pub fn update_incident(&self, incident: &Incident) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            r#"UPDATE incidents SET
               title = ?2, description = ?3, service_id = ?4, severity = ?5,
               triggered_by = ?6, updated_at = ?7
               WHERE id = ?1"#,
            params![
                incident.id,
                incident.title,
                incident.description,
                incident.service_id,
                incident.severity.as_str(),
                incident.triggered_by,
                incident.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(count > 0)
    }

    /// Guarded state-machine transition. The status check, the update
    /// and the audit event share one transaction, so a redundant call
    /// is rejected without ever appending a duplicate event.
    pub fn transition_incident(
        &self,
        id: &str,
        action: IncidentAction,
    ) -> Result<TransitionOutcome, rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let current: Option<String> = {
            let mut stmt = tx.prepare("SELECT status FROM incidents WHERE id = ?1")?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let Some(current) = current else {
            return Ok(TransitionOutcome::NotFound);
        };
        let current = parse_enum_value::<IncidentStatus>(0, current)?;

        let (target, event_type, event_message) = match action {
            IncidentAction::Acknowledge => (
                IncidentStatus::Ongoing,
                IncidentEventType::Acknowledged,
                "Incident acknowledged",
            ),
            IncidentAction::Resolve => (
                IncidentStatus::Resolved,
                IncidentEventType::Resolved,
                "Incident resolved",
            ),
        };
        if !current.can_transition_to(target) {
            return Ok(TransitionOutcome::Invalid(current));
        }

        let now = Utc::now();
        match action {
            IncidentAction::Acknowledge => tx.execute(
                "UPDATE incidents SET status = ?2, acknowledged_at = ?3, updated_at = ?3 WHERE id = ?1",
                params![id, target.as_str(), now.to_rfc3339()],
            )?,
            IncidentAction::Resolve => tx.execute(
                "UPDATE incidents SET status = ?2, resolved_at = ?3, updated_at = ?3 WHERE id = ?1",
                params![id, target.as_str(), now.to_rfc3339()],
            )?,
        };
        tx.execute(
            r#"INSERT INTO incident_events (id, incident_id, event_type, message, author, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                uuid::Uuid::new_v4().to_string(),
                id,
                event_type.as_str(),
                event_message,
                Option::<String>::None,
                now.to_rfc3339(),
            ],
        )?;

        let incident = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1"
            ))?;
            stmt.query_row(params![id], |row| row_to_incident(row))?
        };
        tx.commit()?;

        Ok(TransitionOutcome::Done(incident))
    }

    pub fn incident_exists(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM incidents WHERE id = ?1",
            params![id],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    /// Audit trail in insertion order.
    pub fn list_incident_events(
        &self,
        incident_id: &str,
    ) -> Result<Vec<IncidentEvent>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, incident_id, event_type, message, author, created_at
             FROM incident_events WHERE incident_id = ?1 ORDER BY created_at ASC",
        )?;
        let mut rows = stmt.query(params![incident_id])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(row_to_incident_event(row)?);
        }
        Ok(events)
    }

    pub fn append_incident_event(&self, event: &IncidentEvent) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT INTO incident_events (id, incident_id, event_type, message, author, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                event.id,
                event.incident_id,
                event.event_type.as_str(),
                event.message,
                event.author,
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_incident(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM incident_events WHERE incident_id = ?1",
            params![id],
        )?;
        let count = tx.execute("DELETE FROM incidents WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(count > 0)
    }

    // ==========================================================================
    // SLOs
    // ==========================================================================

    pub fn insert_slo(&self, slo: &Slo) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"INSERT INTO slos
               (id, name, service_id, target_availability, current_availability,
                latency_target, latency_current, error_budget_total, error_budget_consumed,
                is_breaching, is_budget_exhausted, period, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                slo.id,
                slo.name,
                slo.service_id,
                slo.target_availability,
                slo.current_availability,
                slo.latency_target,
                slo.latency_current,
                slo.error_budget_total,
                slo.error_budget_consumed,
                slo.is_breaching,
                slo.is_budget_exhausted,
                slo.period,
                slo.created_at.to_rfc3339(),
                slo.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_slo(&self, id: &str) -> Result<Option<Slo>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT {SLO_COLUMNS} FROM slos WHERE id = ?1"))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_slo(row)?)),
            None => Ok(None),
        }
    }

    pub fn list_slos(
        &self,
        service_id: Option<&str>,
        breaching: Option<bool>,
    ) -> Result<Vec<Slo>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {SLO_COLUMNS} FROM slos WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(sid) = service_id {
            sql.push_str(" AND service_id = ?");
            params_vec.push(Box::new(sid.to_string()));
        }
        if let Some(b) = breaching {
            sql.push_str(" AND is_breaching = ?");
            params_vec.push(Box::new(b));
        }
        sql.push_str(" ORDER BY created_at DESC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_refs.as_slice())?;
        let mut slos = Vec::new();
        while let Some(row) = rows.next()? {
            slos.push(row_to_slo(row)?);
        }
        Ok(slos)
    }

    /// The caller must have run `recompute_derived` after merging in
    /// the new source values; the store persists whatever is given.
    pub fn update_slo(&self, slo: &Slo) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute(
            r#"UPDATE slos SET
               name = ?2, service_id = ?3, target_availability = ?4,
               current_availability = ?5, latency_target = ?6, latency_current = ?7,
               error_budget_total = ?8, error_budget_consumed = ?9, is_breaching = ?10,
               is_budget_exhausted = ?11, period = ?12, updated_at = ?13
               WHERE id = ?1"#,
            params![
                slo.id,
                slo.name,
                slo.service_id,
                slo.target_availability,
                slo.current_availability,
                slo.latency_target,
                slo.latency_current,
                slo.error_budget_total,
                slo.error_budget_consumed,
                slo.is_breaching,
                slo.is_budget_exhausted,
                slo.period,
                slo.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(count > 0)
    }

    pub fn delete_slo(&self, id: &str) -> Result<bool, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute("DELETE FROM slos WHERE id = ?1", params![id])?;
        Ok(count > 0)
    }

    // ==========================================================================
    // Logs
    // ==========================================================================

    pub fn insert_logs(&self, entries: &[LogEntry]) -> Result<usize, rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for entry in entries {
            let metadata = entry
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default());
            tx.execute(
                r#"INSERT INTO logs (id, service_id, level, message, trace_id, metadata, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                params![
                    entry.id,
                    entry.service_id,
                    entry.level.as_str(),
                    entry.message,
                    entry.trace_id,
                    metadata,
                    entry.created_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(entries.len())
    }

    pub fn list_logs(
        &self,
        service_id: Option<&str>,
        level: Option<LogLevel>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<LogEntry>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, service_id, level, message, trace_id, metadata, created_at
             FROM logs WHERE 1=1",
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(sid) = service_id {
            sql.push_str(" AND service_id = ?");
            params_vec.push(Box::new(sid.to_string()));
        }
        if let Some(lvl) = level {
            sql.push_str(" AND level = ?");
            params_vec.push(Box::new(lvl.as_str().to_string()));
        }
        if let Some(since) = since {
            sql.push_str(" AND created_at >= ?");
            params_vec.push(Box::new(since.to_rfc3339()));
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");
        params_vec.push(Box::new(limit as i64));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_refs.as_slice())?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(row_to_log(row)?);
        }
        Ok(entries)
    }

    /// ERROR-level volume inside the trailing validation window.
    pub fn count_error_logs_since(&self, cutoff: DateTime<Utc>) -> Result<i64, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM logs WHERE level = 'ERROR' AND created_at >= ?1",
            params![cutoff.to_rfc3339()],
            |r| r.get(0),
        )
    }

    /// Logs are append-only; the only destructive operation is a bulk
    /// clear.
    pub fn clear_logs(&self) -> Result<usize, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        let count = conn.execute("DELETE FROM logs", [])?;
        Ok(count)
    }

    // ==========================================================================
    // Metrics
    // ==========================================================================

    pub fn insert_metrics(&self, samples: &[MetricSample]) -> Result<usize, rusqlite::Error> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for sample in samples {
            tx.execute(
                r#"INSERT INTO metrics (id, service_id, metric_name, value, unit, recorded_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                params![
                    sample.id,
                    sample.service_id,
                    sample.metric_name,
                    sample.value,
                    sample.unit,
                    sample.recorded_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(samples.len())
    }

    pub fn list_metrics(
        &self,
        service_id: Option<&str>,
        metric_name: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<MetricSample>, rusqlite::Error> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, service_id, metric_name, value, unit, recorded_at
             FROM metrics WHERE 1=1",
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(sid) = service_id {
            sql.push_str(" AND service_id = ?");
            params_vec.push(Box::new(sid.to_string()));
        }
        if let Some(name) = metric_name {
            sql.push_str(" AND metric_name = ?");
            params_vec.push(Box::new(name.to_string()));
        }
        if let Some(since) = since {
            sql.push_str(" AND recorded_at >= ?");
            params_vec.push(Box::new(since.to_rfc3339()));
        }
        sql.push_str(" ORDER BY recorded_at DESC LIMIT ?");
        params_vec.push(Box::new(limit as i64));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_refs.as_slice())?;
        let mut samples = Vec::new();
        while let Some(row) = rows.next()? {
            samples.push(row_to_metric(row)?);
        }
        Ok(samples)
    }
}

// ==========================================================================
// Row mapping
// ==========================================================================

const SERVICE_COLUMNS: &str = "id, name, display_name, description, status, uptime, \
     latency_p50, latency_p99, error_rate, cpu_usage, memory_usage, \
     requests_per_second, created_at, updated_at, last_checked_at";

const ALERT_COLUMNS: &str = "id, title, name, service_id, severity, message, metric_name, \
     threshold, current_value, is_active, fired_at, acknowledged_at, silenced_until, \
     resolved_at, created_at";

const INCIDENT_COLUMNS: &str = "id, incident_number, title, description, service_id, severity, \
     status, triggered_by, started_at, acknowledged_at, resolved_at, created_at, updated_at";

const SLO_COLUMNS: &str = "id, name, service_id, target_availability, current_availability, \
     latency_target, latency_current, error_budget_total, error_budget_consumed, \
     is_breaching, is_budget_exhausted, period, created_at, updated_at";

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_ts(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    parse_ts(idx, row.get(idx)?)
}

fn get_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|s| parse_ts(idx, s))
        .transpose()
}

fn parse_enum_value<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| conversion_err(idx, e))
}

fn get_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_enum_value(idx, row.get(idx)?)
}

fn row_to_service(row: &Row<'_>) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        status: get_enum(row, 4)?,
        uptime: row.get(5)?,
        latency_p50: row.get(6)?,
        latency_p99: row.get(7)?,
        error_rate: row.get(8)?,
        cpu_usage: row.get(9)?,
        memory_usage: row.get(10)?,
        requests_per_second: row.get(11)?,
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
        last_checked_at: get_opt_ts(row, 14)?,
    })
}

fn row_to_alert(row: &Row<'_>) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        title: row.get(1)?,
        name: row.get(2)?,
        service_id: row.get(3)?,
        severity: get_enum(row, 4)?,
        message: row.get(5)?,
        metric_name: row.get(6)?,
        threshold: row.get(7)?,
        current_value: row.get(8)?,
        is_active: row.get(9)?,
        fired_at: get_ts(row, 10)?,
        acknowledged_at: get_opt_ts(row, 11)?,
        silenced_until: get_opt_ts(row, 12)?,
        resolved_at: get_opt_ts(row, 13)?,
        created_at: get_ts(row, 14)?,
    })
}

fn row_to_incident(row: &Row<'_>) -> rusqlite::Result<Incident> {
    Ok(Incident {
        id: row.get(0)?,
        incident_number: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        service_id: row.get(4)?,
        severity: get_enum(row, 5)?,
        status: get_enum(row, 6)?,
        triggered_by: row.get(7)?,
        started_at: get_ts(row, 8)?,
        acknowledged_at: get_opt_ts(row, 9)?,
        resolved_at: get_opt_ts(row, 10)?,
        created_at: get_ts(row, 11)?,
        updated_at: get_ts(row, 12)?,
    })
}

fn row_to_incident_event(row: &Row<'_>) -> rusqlite::Result<IncidentEvent> {
    Ok(IncidentEvent {
        id: row.get(0)?,
        incident_id: row.get(1)?,
        event_type: get_enum(row, 2)?,
        message: row.get(3)?,
        author: row.get(4)?,
        created_at: get_ts(row, 5)?,
    })
}

fn row_to_slo(row: &Row<'_>) -> rusqlite::Result<Slo> {
    Ok(Slo {
        id: row.get(0)?,
        name: row.get(1)?,
        service_id: row.get(2)?,
        target_availability: row.get(3)?,
        current_availability: row.get(4)?,
        latency_target: row.get(5)?,
        latency_current: row.get(6)?,
        error_budget_total: row.get(7)?,
        error_budget_consumed: row.get(8)?,
        is_breaching: row.get(9)?,
        is_budget_exhausted: row.get(10)?,
        period: row.get(11)?,
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
    })
}

fn row_to_log(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let metadata = row
        .get::<_, Option<String>>(5)?
        .map(|s| serde_json::from_str(&s).map_err(|e| conversion_err(5, e)))
        .transpose()?;
    Ok(LogEntry {
        id: row.get(0)?,
        service_id: row.get(1)?,
        level: get_enum(row, 2)?,
        message: row.get(3)?,
        trace_id: row.get(4)?,
        metadata,
        created_at: get_ts(row, 6)?,
    })
}

fn row_to_metric(row: &Row<'_>) -> rusqlite::Result<MetricSample> {
    Ok(MetricSample {
        id: row.get(0)?,
        service_id: row.get(1)?,
        metric_name: row.get(2)?,
        value: row.get(3)?,
        unit: row.get(4)?,
        recorded_at: get_ts(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdeck_core::ServiceStatus;

    fn test_service(name: &str) -> Service {
        let now = Utc::now();
        Service {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            display_name: name.to_string(),
            description: None,
            status: ServiceStatus::Healthy,
            uptime: 99.9,
            latency_p50: 40.0,
            latency_p99: 200.0,
            error_rate: 0.1,
            cpu_usage: 25.0,
            memory_usage: 40.0,
            requests_per_second: 120.0,
            created_at: now,
            updated_at: now,
            last_checked_at: None,
        }
    }

    fn test_alert(severity: AlertSeverity, service_id: Option<String>) -> Alert {
        let now = Utc::now();
        Alert {
            id: uuid::Uuid::new_v4().to_string(),
            title: "latency over threshold".to_string(),
            name: None,
            service_id,
            severity,
            message: None,
            metric_name: Some("latency_p99".to_string()),
            threshold: Some(250.0),
            current_value: Some(410.0),
            is_active: true,
            fired_at: now,
            acknowledged_at: None,
            silenced_until: None,
            resolved_at: None,
            created_at: now,
        }
    }

    #[test]
    fn service_crud_and_alphabetical_listing() {
        let db = Database::open_in_memory().unwrap();

        db.insert_service(&test_service("zeta")).unwrap();
        db.insert_service(&test_service("alpha")).unwrap();

        let services = db.list_services().unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "alpha");
        assert_eq!(services[1].name, "zeta");

        let mut svc = services[0].clone();
        svc.status = ServiceStatus::Degraded;
        svc.error_rate = 6.5;
        assert!(db.update_service(&svc).unwrap());

        let loaded = db.get_service(&svc.id).unwrap().unwrap();
        assert_eq!(loaded.status, ServiceStatus::Degraded);
        assert_eq!(loaded.error_rate, 6.5);

        assert!(db.delete_service(&svc.id).unwrap());
        assert!(db.get_service(&svc.id).unwrap().is_none());
        assert!(!db.delete_service(&svc.id).unwrap());
    }

    #[test]
    fn duplicate_service_slug_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.insert_service(&test_service("api")).unwrap();
        assert!(db.insert_service(&test_service("api")).is_err());
    }

    #[test]
    fn alert_filters_and_lifecycle_fields() {
        let db = Database::open_in_memory().unwrap();
        let svc = test_service("api");
        db.insert_service(&svc).unwrap();

        db.insert_alert(&test_alert(AlertSeverity::Critical, Some(svc.id.clone())))
            .unwrap();
        db.insert_alert(&test_alert(AlertSeverity::Warning, None))
            .unwrap();

        assert_eq!(db.list_alerts(None, None, None).unwrap().len(), 2);
        let critical = db
            .list_alerts(Some(AlertSeverity::Critical), None, None)
            .unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(
            db.list_alerts(None, None, Some(&svc.id)).unwrap().len(),
            1
        );

        let id = critical[0].id.clone();
        let acked = db.acknowledge_alert(&id).unwrap().unwrap();
        assert!(acked.acknowledged_at.is_some());
        assert!(acked.is_active, "acknowledge must not deactivate");

        let silenced = db.silence_alert(&id, 60).unwrap().unwrap();
        assert!(silenced.silenced_until.unwrap() > Utc::now());

        let resolved = db.resolve_alert(&id).unwrap().unwrap();
        assert!(!resolved.is_active);
        assert!(resolved.resolved_at.is_some());
        assert_eq!(
            db.list_alerts(None, Some(true), None).unwrap().len(),
            1,
            "resolved alert drops out of the active filter"
        );

        assert!(db.acknowledge_alert("missing").unwrap().is_none());
    }

    #[test]
    fn incident_creation_is_transactional_with_triggered_event() {
        let db = Database::open_in_memory().unwrap();
        let incident = db
            .create_incident(NewIncident {
                title: "checkout errors spiking".to_string(),
                description: None,
                service_id: None,
                severity: IncidentSeverity::High,
                triggered_by: Some("pager".to_string()),
            })
            .unwrap();

        assert_eq!(incident.status, IncidentStatus::Open);
        let prefix = incident_number_prefix(Utc::now().date_naive());
        assert_eq!(parse_incident_seq(&incident.incident_number, &prefix), Some(1));

        let events = db.list_incident_events(&incident.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, IncidentEventType::Triggered);
    }

    #[test]
    fn incident_numbers_count_up_within_a_day() {
        let db = Database::open_in_memory().unwrap();
        let new = |title: &str| NewIncident {
            title: title.to_string(),
            description: None,
            service_id: None,
            severity: IncidentSeverity::Medium,
            triggered_by: None,
        };
        let first = db.create_incident(new("one")).unwrap();
        let second = db.create_incident(new("two")).unwrap();
        let third = db.create_incident(new("three")).unwrap();

        let prefix = incident_number_prefix(Utc::now().date_naive());
        assert_eq!(parse_incident_seq(&first.incident_number, &prefix), Some(1));
        assert_eq!(parse_incident_seq(&second.incident_number, &prefix), Some(2));
        assert_eq!(parse_incident_seq(&third.incident_number, &prefix), Some(3));
    }

    #[test]
    fn guarded_transitions_never_duplicate_audit_events() {
        let db = Database::open_in_memory().unwrap();
        let incident = db
            .create_incident(NewIncident {
                title: "db failover".to_string(),
                description: None,
                service_id: None,
                severity: IncidentSeverity::Critical,
                triggered_by: None,
            })
            .unwrap();

        let acked = match db
            .transition_incident(&incident.id, IncidentAction::Acknowledge)
            .unwrap()
        {
            TransitionOutcome::Done(i) => i,
            other => panic!("expected Done, got {other:?}"),
        };
        assert_eq!(acked.status, IncidentStatus::Ongoing);
        assert!(acked.acknowledged_at.is_some());

        // Second acknowledge is rejected and appends nothing.
        match db
            .transition_incident(&incident.id, IncidentAction::Acknowledge)
            .unwrap()
        {
            TransitionOutcome::Invalid(from) => assert_eq!(from, IncidentStatus::Ongoing),
            other => panic!("expected Invalid, got {other:?}"),
        }

        let resolved = match db
            .transition_incident(&incident.id, IncidentAction::Resolve)
            .unwrap()
        {
            TransitionOutcome::Done(i) => i,
            other => panic!("expected Done, got {other:?}"),
        };
        assert_eq!(resolved.status, IncidentStatus::Resolved);

        match db
            .transition_incident(&incident.id, IncidentAction::Resolve)
            .unwrap()
        {
            TransitionOutcome::Invalid(from) => assert_eq!(from, IncidentStatus::Resolved),
            other => panic!("expected Invalid, got {other:?}"),
        }

        let events = db.list_incident_events(&incident.id).unwrap();
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                IncidentEventType::Triggered,
                IncidentEventType::Acknowledged,
                IncidentEventType::Resolved,
            ]
        );

        match db
            .transition_incident("missing", IncidentAction::Resolve)
            .unwrap()
        {
            TransitionOutcome::NotFound => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn deleting_an_incident_removes_its_events() {
        let db = Database::open_in_memory().unwrap();
        let incident = db
            .create_incident(NewIncident {
                title: "flapping health checks".to_string(),
                description: None,
                service_id: None,
                severity: IncidentSeverity::Low,
                triggered_by: None,
            })
            .unwrap();

        assert!(db.delete_incident(&incident.id).unwrap());
        assert!(db.list_incident_events(&incident.id).unwrap().is_empty());
        assert!(!db.delete_incident(&incident.id).unwrap());
    }

    #[test]
    fn slo_round_trip_preserves_derived_flags() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let mut slo = Slo {
            id: uuid::Uuid::new_v4().to_string(),
            name: "api availability".to_string(),
            service_id: None,
            target_availability: 99.9,
            current_availability: 99.5,
            latency_target: 200.0,
            latency_current: 150.0,
            error_budget_total: 0.1,
            error_budget_consumed: 0.12,
            is_breaching: false,
            is_budget_exhausted: false,
            period: "30d".to_string(),
            created_at: now,
            updated_at: now,
        };
        slo.recompute_derived();
        db.insert_slo(&slo).unwrap();

        let loaded = db.get_slo(&slo.id).unwrap().unwrap();
        assert!(loaded.is_breaching);
        assert!(loaded.is_budget_exhausted);

        let breaching = db.list_slos(None, Some(true)).unwrap();
        assert_eq!(breaching.len(), 1);
        assert!(db.list_slos(None, Some(false)).unwrap().is_empty());
    }

    #[test]
    fn logs_are_append_only_with_bulk_clear() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let entries: Vec<LogEntry> = (0..3)
            .map(|i| LogEntry {
                id: uuid::Uuid::new_v4().to_string(),
                service_id: None,
                level: if i == 0 { LogLevel::Error } else { LogLevel::Info },
                message: format!("entry {i}"),
                trace_id: None,
                metadata: Some(serde_json::json!({ "seq": i })),
                created_at: now - Duration::seconds(i),
            })
            .collect();
        assert_eq!(db.insert_logs(&entries).unwrap(), 3);

        let all = db.list_logs(None, None, None, 100).unwrap();
        assert_eq!(all.len(), 3);
        // Reverse chronological: newest first.
        assert_eq!(all[0].message, "entry 0");

        let errors = db.list_logs(None, Some(LogLevel::Error), None, 100).unwrap();
        assert_eq!(errors.len(), 1);

        assert_eq!(
            db.count_error_logs_since(now - Duration::minutes(60)).unwrap(),
            1
        );

        assert_eq!(db.list_logs(None, None, None, 2).unwrap().len(), 2);
        assert_eq!(db.clear_logs().unwrap(), 3);
        assert!(db.list_logs(None, None, None, 100).unwrap().is_empty());
    }

    #[test]
    fn metric_series_filter_and_window() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let samples: Vec<MetricSample> = (0..5)
            .map(|i| MetricSample {
                id: uuid::Uuid::new_v4().to_string(),
                service_id: None,
                metric_name: if i % 2 == 0 { "cpu_usage" } else { "latency_p50" }.to_string(),
                value: i as f64,
                unit: None,
                recorded_at: now - Duration::minutes(i),
            })
            .collect();
        assert_eq!(db.insert_metrics(&samples).unwrap(), 5);

        let cpu = db.list_metrics(None, Some("cpu_usage"), None, 100).unwrap();
        assert_eq!(cpu.len(), 3);
        assert_eq!(cpu[0].value, 0.0, "newest sample first");

        let recent = db
            .list_metrics(None, None, Some(now - Duration::minutes(2)), 100)
            .unwrap();
        assert_eq!(recent.len(), 3);
    }
}
