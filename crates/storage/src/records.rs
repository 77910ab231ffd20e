//! Clinical Record Types
//!
//! Plain data shared across the pipeline: sessions, phase-tagged vitals,
//! incidents, machines, and clinical alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a dialysis session (strict forward-only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    /// Whether no further transition can leave this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::NoShow
        )
    }

    /// Position along the forward-only lifecycle; a valid transition never
    /// decreases it.
    pub fn rank(&self) -> u8 {
        match self {
            SessionStatus::Scheduled => 0,
            SessionStatus::CheckedIn => 1,
            SessionStatus::InProgress => 2,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::NoShow => 3,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::CheckedIn => "checked_in",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::NoShow => "no_show",
        };
        f.write_str(s)
    }
}

/// One scheduled dialysis treatment episode for a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Human-readable session number (e.g. "DS-000042")
    pub session_number: String,
    pub patient_id: Uuid,
    pub prescription_id: Uuid,
    /// Non-null only while in_progress or after completion
    pub machine_id: Option<Uuid>,
    pub scheduled_start_time: DateTime<Utc>,
    pub actual_start_time: Option<DateTime<Utc>>,
    /// Set only when status = completed
    pub actual_end_time: Option<DateTime<Utc>>,
    pub actual_duration_minutes: Option<i64>,
    pub status: SessionStatus,
    pub cancellation_reason: Option<String>,
    pub notes: Option<String>,
}

/// Clinical stage of a session at which a vitals record was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Pre,
    Intra,
    Post,
}

/// Fixed set of optional numeric vitals captured in one measurement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vitals {
    pub weight_kg: Option<f64>,
    pub systolic_bp: Option<f64>,
    pub diastolic_bp: Option<f64>,
    pub heart_rate: Option<f64>,
    pub temperature_c: Option<f64>,
    /// Arterial line pressure (mmHg)
    pub arterial_pressure: Option<f64>,
    /// Venous line pressure (mmHg)
    pub venous_pressure: Option<f64>,
    /// Transmembrane pressure (mmHg)
    pub transmembrane_pressure: Option<f64>,
    /// Blood flow rate (mL/min)
    pub blood_flow_rate: Option<f64>,
    /// Dialysate flow rate (mL/min)
    pub dialysate_flow_rate: Option<f64>,
    /// Cumulative ultrafiltration volume (mL)
    pub ultrafiltration_ml: Option<f64>,
    /// Free-text clinical state observation
    pub clinical_state: Option<String>,
}

/// Phase-tagged vitals record, append-only and owned by its session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub record_time: DateTime<Utc>,
    pub vitals: Vitals,
    /// Flagged when an incident is temporally associated with this record
    pub has_incident: bool,
}

/// Clinical adverse event types observed during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Hypotension,
    Hypertension,
    Cramps,
    Nausea,
    Vomiting,
    Headache,
    ChestPain,
    AccessBleeding,
    CircuitClotting,
    FeverChills,
    Other,
}

/// Severity of an adverse event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Mild,
    Moderate,
    Severe,
}

/// Adverse event recorded during a session, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIncident {
    pub id: Uuid,
    pub session_id: Uuid,
    pub incident_time: DateTime<Utc>,
    pub incident_type: IncidentType,
    pub severity: IncidentSeverity,
    pub description: Option<String>,
    pub intervention: Option<String>,
    pub outcome: Option<String>,
}

/// Operational state of a dialysis machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    Available,
    InUse,
    Maintenance,
    OutOfService,
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MachineStatus::Available => "available",
            MachineStatus::InUse => "in_use",
            MachineStatus::Maintenance => "maintenance",
            MachineStatus::OutOfService => "out_of_service",
        };
        f.write_str(s)
    }
}

/// Dialysis machine (external resource, referenced not owned)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Machine {
    pub id: Uuid,
    /// Stable human-readable number used for ordering (e.g. "M-03")
    pub machine_number: String,
    pub status: MachineStatus,
    /// Reserved for patients requiring infection-control isolation
    pub isolation_only: bool,
    /// Set by the external maintenance collaborator; consulted on release
    pub maintenance_pending: bool,
}

/// Kind of clinical condition an alert reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PrescriptionRenewal,
    LabDue,
    Vaccination,
    VascularAccess,
    SerologyUpdate,
    WeightDeviation,
    Custom,
}

/// Severity of a clinical alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// Lifecycle state of a clinical alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Dismissed => "dismissed",
        };
        f.write_str(s)
    }
}

/// Actionable clinical alert emitted by the rule engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalAlert {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub status: AlertStatus,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
