//! Session Lifecycle Manager Implementation

use crate::error::LifecycleError;
use crate::vitals::{VitalsConfig, VitalsValidator};
use chrono::{DateTime, Utc};
use machine_allocator::MachineAllocator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{
    IncidentSeverity, IncidentType, Repository, Session, SessionIncident, SessionPhase,
    SessionRecord, SessionStatus, Vitals,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Patient data provider consumed by the lifecycle (external collaborator).
/// Only the isolation requirement is needed here.
pub trait PatientDirectory: Send + Sync {
    /// Whether this patient requires an infection-control isolation machine
    fn requires_isolation(&self, patient_id: Uuid) -> bool;
}

/// Request to schedule a new session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub patient_id: Uuid,
    pub prescription_id: Uuid,
    pub scheduled_start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Incoming adverse-event report for an in-progress session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDraft {
    #[serde(rename = "type")]
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub description: Option<String>,
    pub intervention: Option<String>,
    pub outcome: Option<String>,
}

/// State machine governing a single dialysis session.
///
/// Transitions are strict forward-only; every operation guard-checks the
/// current status under the session table lock before mutating, so
/// re-invoking an operation fails cleanly instead of double-applying.
#[derive(Clone)]
pub struct SessionManager {
    repository: Arc<Repository>,
    allocator: MachineAllocator,
    patients: Arc<dyn PatientDirectory>,
    validator: Arc<VitalsValidator>,
}

fn guard(
    session: &Session,
    expected: &[SessionStatus],
    attempted: &'static str,
) -> Result<(), LifecycleError> {
    if !expected.contains(&session.status) {
        return Err(LifecycleError::InvalidStateTransition {
            from: session.status,
            attempted,
        });
    }
    Ok(())
}

impl SessionManager {
    pub fn new(
        repository: Arc<Repository>,
        allocator: MachineAllocator,
        patients: Arc<dyn PatientDirectory>,
        vitals_config: VitalsConfig,
    ) -> Self {
        Self {
            repository,
            allocator,
            patients,
            validator: Arc::new(VitalsValidator::new(vitals_config)),
        }
    }

    /// Create a new session in `scheduled` with a generated session number
    pub fn schedule(&self, request: ScheduleRequest) -> Result<Session, LifecycleError> {
        let session = Session {
            id: Uuid::new_v4(),
            session_number: self.repository.next_session_number()?,
            patient_id: request.patient_id,
            prescription_id: request.prescription_id,
            machine_id: None,
            scheduled_start_time: request.scheduled_start_time,
            actual_start_time: None,
            actual_end_time: None,
            actual_duration_minutes: None,
            status: SessionStatus::Scheduled,
            cancellation_reason: None,
            notes: request.notes,
        };
        self.repository.insert_session(session.clone())?;
        info!(
            "Scheduled session {} for patient {}",
            session.session_number, session.patient_id
        );
        Ok(session)
    }

    /// scheduled → checked_in
    pub fn check_in(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        self.repository.with_session_mut(session_id, |session| {
            guard(session, &[SessionStatus::Scheduled], "check in")?;
            session.status = SessionStatus::CheckedIn;
            info!("Session {} checked in", session.session_number);
            Ok(session.clone())
        })
    }

    /// checked_in → in_progress, binding the machine exclusively.
    ///
    /// The machine bind happens first; if the session transition then loses
    /// its race the bind is compensated with a release.
    pub fn start(
        &self,
        session_id: Uuid,
        machine_id: Option<Uuid>,
    ) -> Result<Session, LifecycleError> {
        let session = self.repository.get_session(session_id)?;
        guard(&session, &[SessionStatus::CheckedIn], "start")?;

        // The caller resolves a machine before starting; none supplied is a
        // clinical-workflow violation, not something to auto-pick here.
        let machine_id = machine_id.ok_or(LifecycleError::MachineRequired)?;

        if self.patients.requires_isolation(session.patient_id) {
            let machine = self.repository.get_machine(machine_id)?;
            if !machine.isolation_only {
                warn!(
                    "Session {}: isolation-required patient offered non-isolation machine {}",
                    session.session_number, machine.machine_number
                );
                return Err(LifecycleError::MachineRequired);
            }
        }

        self.allocator.bind(session_id, machine_id)?;

        let result = self.repository.with_session_mut(session_id, |session| {
            guard(session, &[SessionStatus::CheckedIn], "start")?;
            session.status = SessionStatus::InProgress;
            session.machine_id = Some(machine_id);
            session.actual_start_time = Some(Utc::now());
            info!("Session {} started", session.session_number);
            Ok(session.clone())
        });

        if result.is_err() {
            // Lost the session race after winning the machine; give it back.
            if let Err(e) = self.allocator.release(machine_id) {
                warn!("Failed to release machine after lost start race: {}", e);
            }
        }
        result
    }

    /// in_progress → completed; computes the rounded duration and releases
    /// the machine binding.
    pub fn complete(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        let completed = self.repository.with_session_mut(session_id, |session| {
            guard(session, &[SessionStatus::InProgress], "complete")?;
            let started = session.actual_start_time.ok_or_else(|| {
                LifecycleError::Storage(storage::StorageError::DatabaseError(
                    "in_progress session has no start time".to_string(),
                ))
            })?;
            let ended = Utc::now();
            let minutes = ((ended - started).num_seconds() as f64 / 60.0).round() as i64;
            session.actual_end_time = Some(ended);
            session.actual_duration_minutes = Some(minutes);
            session.status = SessionStatus::Completed;
            info!(
                "Session {} completed after {} minutes",
                session.session_number, minutes
            );
            Ok::<_, LifecycleError>(session.clone())
        })?;

        if let Some(machine_id) = completed.machine_id {
            self.allocator.release(machine_id)?;
        }
        Ok(completed)
    }

    /// {scheduled, checked_in} → cancelled; the reason is mandatory
    pub fn cancel(&self, session_id: Uuid, reason: &str) -> Result<Session, LifecycleError> {
        if reason.trim().is_empty() {
            return Err(LifecycleError::ReasonRequired);
        }
        self.repository.with_session_mut(session_id, |session| {
            guard(
                session,
                &[SessionStatus::Scheduled, SessionStatus::CheckedIn],
                "cancel",
            )?;
            session.status = SessionStatus::Cancelled;
            session.cancellation_reason = Some(reason.trim().to_string());
            info!("Session {} cancelled: {}", session.session_number, reason);
            Ok(session.clone())
        })
    }

    /// scheduled → no_show. The timeout policy that decides *when* a patient
    /// is a no-show belongs to an external scheduler; this is only its hook.
    pub fn mark_no_show(&self, session_id: Uuid) -> Result<Session, LifecycleError> {
        self.repository.with_session_mut(session_id, |session| {
            guard(session, &[SessionStatus::Scheduled], "mark as no-show")?;
            session.status = SessionStatus::NoShow;
            info!("Session {} marked as no-show", session.session_number);
            Ok(session.clone())
        })
    }

    /// Append a phase-tagged vitals record; requires in_progress
    pub fn add_record(
        &self,
        session_id: Uuid,
        phase: SessionPhase,
        vitals: Vitals,
    ) -> Result<SessionRecord, LifecycleError> {
        self.validator.validate(&vitals)?;
        self.repository.with_session_mut(session_id, |session| {
            guard(session, &[SessionStatus::InProgress], "record vitals for")?;
            let record = SessionRecord {
                id: Uuid::new_v4(),
                session_id,
                phase,
                record_time: Utc::now(),
                vitals,
                has_incident: false,
            };
            self.repository.insert_record(record.clone())?;
            Ok(record)
        })
    }

    /// Append an adverse event; requires in_progress. The most recent vitals
    /// record of the session is retroactively flagged as incident-associated.
    pub fn add_incident(
        &self,
        session_id: Uuid,
        draft: IncidentDraft,
    ) -> Result<SessionIncident, LifecycleError> {
        self.repository.with_session_mut(session_id, |session| {
            guard(session, &[SessionStatus::InProgress], "report an incident for")?;
            let incident = SessionIncident {
                id: Uuid::new_v4(),
                session_id,
                incident_time: Utc::now(),
                incident_type: draft.incident_type,
                severity: draft.severity,
                description: draft.description,
                intervention: draft.intervention,
                outcome: draft.outcome,
            };
            self.repository.insert_incident(incident.clone())?;
            let flagged = self.repository.flag_latest_record(session_id)?;
            if !flagged {
                warn!(
                    "Incident on session {} with no vitals record to flag",
                    session.session_number
                );
            }
            Ok(incident)
        })
    }
}
