//! Storage Layer
//!
//! Provides clinical record types and persistence with repository pattern.

mod records;
mod repository;

pub use records::{
    AlertSeverity, AlertStatus, AlertType, ClinicalAlert, IncidentSeverity, IncidentType, Machine,
    MachineStatus, Session, SessionIncident, SessionPhase, SessionRecord, SessionStatus, Vitals,
};
pub use repository::Repository;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
}
