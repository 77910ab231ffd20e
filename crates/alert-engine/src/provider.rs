//! Clinical Data Provider Seam
//!
//! The rule engine reads patient clinical context through this trait; the
//! real clinic backend supplies an implementation, and the in-memory one
//! below backs the api crate and tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use storage::StorageError;
use uuid::Uuid;

/// Clinical snapshot of one dialysis patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub id: Uuid,
    /// Target post-dialysis weight (kg)
    pub dry_weight_kg: Option<f64>,
    /// Infection-control isolation requirement
    pub requires_isolation: bool,
    pub hepatitis_b_vaccinated: bool,
    /// First dialysis treatment date
    pub dialysis_start_date: Option<DateTime<Utc>>,
    pub serology_last_update: Option<DateTime<Utc>>,
}

/// Active prescription summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionInfo {
    pub patient_id: Uuid,
    pub active: bool,
    pub end_date: Option<DateTime<Utc>>,
}

/// Vascular access summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VascularAccessInfo {
    pub patient_id: Uuid,
    /// e.g. "AV fistula", "tunneled catheter"
    pub access_type: String,
    pub next_control_date: Option<DateTime<Utc>>,
}

/// Read access to patient clinical data (external collaborator)
pub trait ClinicalDataProvider: Send + Sync {
    /// Patients in the active dialysis program
    fn active_patients(&self) -> Result<Vec<PatientProfile>, StorageError>;

    fn prescriptions_for(&self, patient_id: Uuid) -> Result<Vec<PrescriptionInfo>, StorageError>;

    /// Date of the most recent lab result, if any
    fn last_lab_date(&self, patient_id: Uuid) -> Result<Option<DateTime<Utc>>, StorageError>;

    fn vascular_accesses_for(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<VascularAccessInfo>, StorageError>;
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::DatabaseError(format!("Lock error: {}", e))
}

/// In-memory clinical data set
#[derive(Default)]
pub struct InMemoryClinicalData {
    patients: Mutex<Vec<PatientProfile>>,
    prescriptions: Mutex<Vec<PrescriptionInfo>>,
    lab_dates: Mutex<HashMap<Uuid, DateTime<Utc>>>,
    accesses: Mutex<Vec<VascularAccessInfo>>,
}

impl InMemoryClinicalData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_patient(&self, patient: PatientProfile) {
        if let Ok(mut patients) = self.patients.lock() {
            patients.push(patient);
        }
    }

    pub fn add_prescription(&self, prescription: PrescriptionInfo) {
        if let Ok(mut prescriptions) = self.prescriptions.lock() {
            prescriptions.push(prescription);
        }
    }

    pub fn set_last_lab_date(&self, patient_id: Uuid, date: DateTime<Utc>) {
        if let Ok(mut dates) = self.lab_dates.lock() {
            dates.insert(patient_id, date);
        }
    }

    pub fn add_access(&self, access: VascularAccessInfo) {
        if let Ok(mut accesses) = self.accesses.lock() {
            accesses.push(access);
        }
    }

    /// Isolation requirement lookup used by the session lifecycle.
    /// Unknown patients default to no isolation.
    pub fn requires_isolation(&self, patient_id: Uuid) -> bool {
        self.patients
            .lock()
            .map(|patients| {
                patients
                    .iter()
                    .any(|p| p.id == patient_id && p.requires_isolation)
            })
            .unwrap_or(false)
    }
}

impl ClinicalDataProvider for InMemoryClinicalData {
    fn active_patients(&self) -> Result<Vec<PatientProfile>, StorageError> {
        Ok(self.patients.lock().map_err(lock_err)?.clone())
    }

    fn prescriptions_for(&self, patient_id: Uuid) -> Result<Vec<PrescriptionInfo>, StorageError> {
        Ok(self
            .prescriptions
            .lock()
            .map_err(lock_err)?
            .iter()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect())
    }

    fn last_lab_date(&self, patient_id: Uuid) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.lab_dates.lock().map_err(lock_err)?.get(&patient_id).copied())
    }

    fn vascular_accesses_for(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<VascularAccessInfo>, StorageError> {
        Ok(self
            .accesses
            .lock()
            .map_err(lock_err)?
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect())
    }
}
