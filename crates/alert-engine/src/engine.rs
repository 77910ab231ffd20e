//! Alert Generation Pass

use crate::provider::{ClinicalDataProvider, PatientProfile};
use crate::rules::{evaluate_all, RuleConfig, RuleContext};
use crate::AlertError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use storage::{AlertStatus, ClinicalAlert, Repository};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one generation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationSummary {
    pub patients_scanned: usize,
    pub alerts_created: usize,
    /// Rules that fired but already had an active alert
    pub duplicates_suppressed: usize,
    /// Patients whose evaluation failed and was skipped
    pub patients_failed: usize,
}

/// One synchronous rule-evaluation pass over the active patient population.
///
/// The pass is idempotent: a rule only materialises an alert if no *active*
/// alert of the same (patient, type) exists, so re-running it against
/// unchanged data creates nothing. Resolved and dismissed alerts are left
/// untouched for audit.
pub struct AlertEngine {
    repository: Arc<Repository>,
    provider: Arc<dyn ClinicalDataProvider>,
    config: RuleConfig,
}

impl AlertEngine {
    pub fn new(
        repository: Arc<Repository>,
        provider: Arc<dyn ClinicalDataProvider>,
        config: RuleConfig,
    ) -> Self {
        Self {
            repository,
            provider,
            config,
        }
    }

    /// Run one pass. A failure for one patient is logged and skipped; it
    /// never aborts generation for the rest of the population.
    pub fn generate(&self) -> Result<GenerationSummary, AlertError> {
        let now = Utc::now();
        let patients = self.provider.active_patients()?;
        let mut summary = GenerationSummary {
            patients_scanned: patients.len(),
            ..Default::default()
        };

        for patient in &patients {
            match self.evaluate_patient(patient, now) {
                Ok((created, suppressed)) => {
                    summary.alerts_created += created;
                    summary.duplicates_suppressed += suppressed;
                }
                Err(e) => {
                    warn!("Alert evaluation failed for patient {}: {}", patient.id, e);
                    summary.patients_failed += 1;
                }
            }
        }

        info!(
            "Alert pass: {} patients, {} created, {} suppressed, {} failed",
            summary.patients_scanned,
            summary.alerts_created,
            summary.duplicates_suppressed,
            summary.patients_failed
        );
        Ok(summary)
    }

    fn evaluate_patient(
        &self,
        patient: &PatientProfile,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), AlertError> {
        let prescriptions = self.provider.prescriptions_for(patient.id)?;
        let last_lab_date = self.provider.last_lab_date(patient.id)?;
        let accesses = self.provider.vascular_accesses_for(patient.id)?;
        let latest_weight_kg = self
            .repository
            .latest_weight_for_patient(patient.id)?
            .map(|(_, w)| w);

        let ctx = RuleContext {
            patient,
            prescriptions: &prescriptions,
            last_lab_date,
            accesses: &accesses,
            latest_weight_kg,
        };

        let mut created = 0;
        let mut suppressed = 0;
        for draft in evaluate_all(&ctx, &self.config, now) {
            if self
                .repository
                .has_active_alert(patient.id, draft.alert_type)?
            {
                debug!(
                    "Suppressing duplicate {:?} alert for patient {}",
                    draft.alert_type, patient.id
                );
                suppressed += 1;
                continue;
            }
            self.repository.insert_alert(ClinicalAlert {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                alert_type: draft.alert_type,
                severity: draft.severity,
                title: draft.title,
                description: draft.description,
                due_date: draft.due_date,
                status: AlertStatus::Active,
                acknowledged_at: None,
                resolved_at: None,
                resolution_notes: None,
                created_at: now,
            })?;
            created += 1;
        }
        Ok((created, suppressed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{InMemoryClinicalData, PrescriptionInfo, VascularAccessInfo};
    use crate::AlertLifecycle;
    use chrono::Duration;
    use storage::{AlertType, StorageError};

    fn overdue_patient(data: &InMemoryClinicalData) -> Uuid {
        let patient_id = Uuid::new_v4();
        data.add_patient(PatientProfile {
            id: patient_id,
            dry_weight_kg: None,
            requires_isolation: false,
            hepatitis_b_vaccinated: true,
            dialysis_start_date: None,
            serology_last_update: Some(Utc::now()),
        });
        data.set_last_lab_date(patient_id, Utc::now());
        data.add_prescription(PrescriptionInfo {
            patient_id,
            active: true,
            end_date: Some(Utc::now() - Duration::days(3)),
        });
        patient_id
    }

    fn engine_with(data: Arc<InMemoryClinicalData>) -> (Arc<Repository>, AlertEngine) {
        let repo = Arc::new(Repository::new());
        let engine = AlertEngine::new(Arc::clone(&repo), data, RuleConfig::default());
        (repo, engine)
    }

    #[test]
    fn test_pass_creates_alert_for_overdue_prescription() {
        let data = Arc::new(InMemoryClinicalData::new());
        let patient_id = overdue_patient(&data);
        let (repo, engine) = engine_with(data);

        let summary = engine.generate().unwrap();
        assert_eq!(summary.patients_scanned, 1);
        assert_eq!(summary.alerts_created, 1);

        let alerts = repo.list_alerts(Some(patient_id), None, 10).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::PrescriptionRenewal);
        assert_eq!(alerts[0].status, AlertStatus::Active);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let data = Arc::new(InMemoryClinicalData::new());
        let _ = overdue_patient(&data);
        let (_repo, engine) = engine_with(data);

        let first = engine.generate().unwrap();
        assert_eq!(first.alerts_created, 1);

        let second = engine.generate().unwrap();
        assert_eq!(second.alerts_created, 0);
        assert_eq!(second.duplicates_suppressed, 1);
    }

    #[test]
    fn test_resolved_alert_is_not_mutated_and_condition_refires() {
        let data = Arc::new(InMemoryClinicalData::new());
        let patient_id = overdue_patient(&data);
        let (repo, engine) = engine_with(data);

        engine.generate().unwrap();
        let alert_id = repo.list_alerts(Some(patient_id), None, 10).unwrap()[0].id;

        let lifecycle = AlertLifecycle::new(Arc::clone(&repo));
        lifecycle.resolve(alert_id, Some("renewed by nephrologist")).unwrap();
        let resolved = repo.get_alert(alert_id).unwrap();

        // Condition still holds, so the next pass creates a *new* alert and
        // leaves the resolved one untouched.
        let summary = engine.generate().unwrap();
        assert_eq!(summary.alerts_created, 1);
        let after = repo.get_alert(alert_id).unwrap();
        assert_eq!(after.status, AlertStatus::Resolved);
        assert_eq!(after.resolved_at, resolved.resolved_at);
        assert_eq!(repo.alert_count(), 2);
    }

    #[test]
    fn test_one_bad_patient_does_not_abort_the_pass() {
        struct FlakyProvider {
            inner: InMemoryClinicalData,
            bad_patient: Uuid,
        }

        impl ClinicalDataProvider for FlakyProvider {
            fn active_patients(&self) -> Result<Vec<PatientProfile>, StorageError> {
                self.inner.active_patients()
            }
            fn prescriptions_for(
                &self,
                patient_id: Uuid,
            ) -> Result<Vec<PrescriptionInfo>, StorageError> {
                if patient_id == self.bad_patient {
                    return Err(StorageError::DatabaseError("corrupt record".to_string()));
                }
                self.inner.prescriptions_for(patient_id)
            }
            fn last_lab_date(
                &self,
                patient_id: Uuid,
            ) -> Result<Option<DateTime<Utc>>, StorageError> {
                self.inner.last_lab_date(patient_id)
            }
            fn vascular_accesses_for(
                &self,
                patient_id: Uuid,
            ) -> Result<Vec<VascularAccessInfo>, StorageError> {
                self.inner.vascular_accesses_for(patient_id)
            }
        }

        let inner = InMemoryClinicalData::new();
        let bad_patient = overdue_patient(&inner);
        let good_patient = overdue_patient(&inner);
        let provider = Arc::new(FlakyProvider { inner, bad_patient });

        let repo = Arc::new(Repository::new());
        let engine = AlertEngine::new(Arc::clone(&repo), provider, RuleConfig::default());

        let summary = engine.generate().unwrap();
        assert_eq!(summary.patients_failed, 1);
        assert_eq!(summary.alerts_created, 1);
        assert_eq!(repo.list_alerts(Some(good_patient), None, 10).unwrap().len(), 1);
    }
}
