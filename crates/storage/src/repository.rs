//! Repository Implementation

use crate::records::{
    AlertStatus, AlertType, ClinicalAlert, Machine, Session, SessionIncident, SessionRecord,
};
use crate::StorageError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Repository for clinical data access (in-memory implementation for now).
///
/// Every table sits behind its own mutex, so each read-modify-write done
/// through a `with_*_mut` closure commits atomically with respect to other
/// callers touching the same table.
pub struct Repository {
    sessions: Mutex<HashMap<Uuid, Session>>,
    session_records: Mutex<Vec<SessionRecord>>,
    incidents: Mutex<Vec<SessionIncident>>,
    machines: Mutex<HashMap<Uuid, Machine>>,
    alerts: Mutex<HashMap<Uuid, ClinicalAlert>>,
    /// Sequence for human-readable session numbers
    next_session_seq: Mutex<u64>,
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::DatabaseError(format!("Lock error: {}", e))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory clinical repository");
        Self {
            sessions: Mutex::new(HashMap::new()),
            session_records: Mutex::new(Vec::new()),
            incidents: Mutex::new(Vec::new()),
            machines: Mutex::new(HashMap::new()),
            alerts: Mutex::new(HashMap::new()),
            next_session_seq: Mutex::new(1),
        }
    }

    /// Create a new repository backed by SQLite (placeholder)
    pub async fn with_sqlite(_db_path: &str) -> Result<Self, StorageError> {
        // In real implementation, we would use sqlx here:
        // let pool = SqlitePool::connect(db_path).await?;
        // Run migrations, setup WAL mode, etc.

        Ok(Self::new())
    }

    // ── Sessions ────────────────────────────────────────────────────────

    /// Next human-readable session number ("DS-000001", ...)
    pub fn next_session_number(&self) -> Result<String, StorageError> {
        let mut seq = self.next_session_seq.lock().map_err(lock_err)?;
        let number = format!("DS-{:06}", *seq);
        *seq += 1;
        Ok(number)
    }

    pub fn insert_session(&self, session: Session) -> Result<(), StorageError> {
        let mut sessions = self.sessions.lock().map_err(lock_err)?;
        debug!("Inserting session {} ({})", session.session_number, session.id);
        sessions.insert(session.id, session);
        Ok(())
    }

    pub fn get_session(&self, id: Uuid) -> Result<Session, StorageError> {
        let sessions = self.sessions.lock().map_err(lock_err)?;
        sessions.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    pub fn sessions_for_patient(&self, patient_id: Uuid) -> Result<Vec<Session>, StorageError> {
        let sessions = self.sessions.lock().map_err(lock_err)?;
        Ok(sessions
            .values()
            .filter(|s| s.patient_id == patient_id)
            .cloned()
            .collect())
    }

    /// Run a closure against a session under the table lock.
    ///
    /// The closure's guard check and mutation commit together, which is what
    /// makes state transitions safe against concurrent callers.
    pub fn with_session_mut<T, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut sessions = self.sessions.lock().map_err(lock_err)?;
        let session = sessions.get_mut(&id).ok_or(StorageError::NotFound)?;
        f(session)
    }

    // ── Session records & incidents ─────────────────────────────────────

    pub fn insert_record(&self, record: SessionRecord) -> Result<(), StorageError> {
        let mut records = self.session_records.lock().map_err(lock_err)?;
        records.push(record);
        Ok(())
    }

    pub fn records_for_session(&self, session_id: Uuid) -> Result<Vec<SessionRecord>, StorageError> {
        let records = self.session_records.lock().map_err(lock_err)?;
        Ok(records
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    /// Flag the most recent record of a session as incident-associated.
    /// Returns whether a record was flagged (sessions may have no vitals yet).
    pub fn flag_latest_record(&self, session_id: Uuid) -> Result<bool, StorageError> {
        let mut records = self.session_records.lock().map_err(lock_err)?;
        let latest = records
            .iter_mut()
            .filter(|r| r.session_id == session_id)
            .max_by_key(|r| r.record_time);
        match latest {
            Some(record) => {
                record.has_incident = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn insert_incident(&self, incident: SessionIncident) -> Result<(), StorageError> {
        let mut incidents = self.incidents.lock().map_err(lock_err)?;
        incidents.push(incident);
        Ok(())
    }

    pub fn incidents_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<SessionIncident>, StorageError> {
        let incidents = self.incidents.lock().map_err(lock_err)?;
        Ok(incidents
            .iter()
            .filter(|i| i.session_id == session_id)
            .cloned()
            .collect())
    }

    /// Newest recorded weight across all of a patient's sessions, if any
    pub fn latest_weight_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Option<(DateTime<Utc>, f64)>, StorageError> {
        let session_ids: Vec<Uuid> = self
            .sessions_for_patient(patient_id)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let records = self.session_records.lock().map_err(lock_err)?;
        Ok(records
            .iter()
            .filter(|r| session_ids.contains(&r.session_id))
            .filter_map(|r| r.vitals.weight_kg.map(|w| (r.record_time, w)))
            .max_by_key(|(t, _)| *t))
    }

    // ── Machines ────────────────────────────────────────────────────────

    pub fn insert_machine(&self, machine: Machine) -> Result<(), StorageError> {
        let mut machines = self.machines.lock().map_err(lock_err)?;
        machines.insert(machine.id, machine);
        Ok(())
    }

    pub fn get_machine(&self, id: Uuid) -> Result<Machine, StorageError> {
        let machines = self.machines.lock().map_err(lock_err)?;
        machines.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    pub fn list_machines(&self) -> Result<Vec<Machine>, StorageError> {
        let machines = self.machines.lock().map_err(lock_err)?;
        let mut list: Vec<Machine> = machines.values().cloned().collect();
        list.sort_by(|a, b| a.machine_number.cmp(&b.machine_number));
        Ok(list)
    }

    /// Run a closure against a machine under the table lock (see
    /// [`Repository::with_session_mut`]). The allocator's bind CAS lives on
    /// top of this.
    pub fn with_machine_mut<T, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Machine) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut machines = self.machines.lock().map_err(lock_err)?;
        let machine = machines.get_mut(&id).ok_or(StorageError::NotFound)?;
        f(machine)
    }

    // ── Alerts ──────────────────────────────────────────────────────────

    pub fn insert_alert(&self, alert: ClinicalAlert) -> Result<(), StorageError> {
        let mut alerts = self.alerts.lock().map_err(lock_err)?;
        debug!(
            "Inserting alert {:?} for patient {}",
            alert.alert_type, alert.patient_id
        );
        alerts.insert(alert.id, alert);
        Ok(())
    }

    pub fn get_alert(&self, id: Uuid) -> Result<ClinicalAlert, StorageError> {
        let alerts = self.alerts.lock().map_err(lock_err)?;
        alerts.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    pub fn with_alert_mut<T, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut ClinicalAlert) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut alerts = self.alerts.lock().map_err(lock_err)?;
        let alert = alerts.get_mut(&id).ok_or(StorageError::NotFound)?;
        f(alert)
    }

    /// Whether an *active* alert of this type already exists for the patient.
    /// This is the rule engine's deduplication primitive.
    pub fn has_active_alert(
        &self,
        patient_id: Uuid,
        alert_type: AlertType,
    ) -> Result<bool, StorageError> {
        let alerts = self.alerts.lock().map_err(lock_err)?;
        Ok(alerts.values().any(|a| {
            a.patient_id == patient_id
                && a.alert_type == alert_type
                && a.status == AlertStatus::Active
        }))
    }

    /// Alerts with optional patient/status filters, newest first
    pub fn list_alerts(
        &self,
        patient_id: Option<Uuid>,
        status: Option<AlertStatus>,
        limit: usize,
    ) -> Result<Vec<ClinicalAlert>, StorageError> {
        let alerts = self.alerts.lock().map_err(lock_err)?;
        let mut list: Vec<ClinicalAlert> = alerts
            .values()
            .filter(|a| patient_id.map_or(true, |p| a.patient_id == p))
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list.truncate(limit);
        Ok(list)
    }

    // ── Counters (health endpoint) ──────────────────────────────────────

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn record_count(&self) -> usize {
        self.session_records.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
