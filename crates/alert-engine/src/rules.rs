//! Clinical Alert Rules
//!
//! Each rule is a pure function over a patient's clinical context. Exact
//! windows and tolerances live on [`RuleConfig`] as named, overridable
//! values.

use crate::provider::{PatientProfile, PrescriptionInfo, VascularAccessInfo};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use storage::{AlertSeverity, AlertType};

/// Rule thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Days before a prescription end date at which renewal is flagged
    pub renewal_window_days: i64,
    /// Maximum days between lab results
    pub lab_interval_days: i64,
    /// Days on dialysis after which a missing hepatitis B vaccination is flagged
    pub vaccination_after_days: i64,
    /// Days before a vascular-access control date at which it is flagged
    pub access_window_days: i64,
    /// Maximum days between serology re-tests
    pub serology_interval_days: i64,
    /// Allowed deviation between latest recorded weight and dry weight (kg)
    pub weight_tolerance_kg: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            renewal_window_days: 30,
            lab_interval_days: 90,
            vaccination_after_days: 90,
            access_window_days: 30,
            serology_interval_days: 180,
            weight_tolerance_kg: 2.0,
        }
    }
}

/// A rule that fired, before deduplication and persistence
#[derive(Debug, Clone)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
}

/// Everything the rules need to know about one patient
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub patient: &'a PatientProfile,
    pub prescriptions: &'a [PrescriptionInfo],
    pub last_lab_date: Option<DateTime<Utc>>,
    pub accesses: &'a [VascularAccessInfo],
    /// Newest weight recorded in any of the patient's sessions
    pub latest_weight_kg: Option<f64>,
}

/// Past-due dates escalate to critical; dates inside the window warn
fn due_severity(due: DateTime<Utc>, now: DateTime<Utc>, window_days: i64) -> Option<AlertSeverity> {
    if due < now {
        Some(AlertSeverity::Critical)
    } else if due <= now + Duration::days(window_days) {
        Some(AlertSeverity::Warning)
    } else {
        None
    }
}

pub fn prescription_renewal(
    ctx: &RuleContext,
    config: &RuleConfig,
    now: DateTime<Utc>,
) -> Option<AlertDraft> {
    // Earliest end date among active prescriptions drives the alert
    let end_date = ctx
        .prescriptions
        .iter()
        .filter(|p| p.active)
        .filter_map(|p| p.end_date)
        .min()?;
    let severity = due_severity(end_date, now, config.renewal_window_days)?;
    let description = if severity == AlertSeverity::Critical {
        format!(
            "Dialysis prescription expired on {}",
            end_date.format("%Y-%m-%d")
        )
    } else {
        format!(
            "Dialysis prescription ends on {}",
            end_date.format("%Y-%m-%d")
        )
    };
    Some(AlertDraft {
        alert_type: AlertType::PrescriptionRenewal,
        severity,
        title: "Prescription renewal due".to_string(),
        description,
        due_date: Some(end_date),
    })
}

pub fn lab_due(ctx: &RuleContext, config: &RuleConfig, now: DateTime<Utc>) -> Option<AlertDraft> {
    let interval = Duration::days(config.lab_interval_days);
    match ctx.last_lab_date {
        Some(last) if now - last <= interval => None,
        Some(last) => Some(AlertDraft {
            alert_type: AlertType::LabDue,
            severity: AlertSeverity::Warning,
            title: "Lab work due".to_string(),
            description: format!("Last lab result dates from {}", last.format("%Y-%m-%d")),
            due_date: Some(last + interval),
        }),
        None => Some(AlertDraft {
            alert_type: AlertType::LabDue,
            severity: AlertSeverity::Warning,
            title: "Lab work due".to_string(),
            description: "No lab result on file".to_string(),
            due_date: None,
        }),
    }
}

pub fn vaccination(
    ctx: &RuleContext,
    config: &RuleConfig,
    now: DateTime<Utc>,
) -> Option<AlertDraft> {
    if ctx.patient.hepatitis_b_vaccinated {
        return None;
    }
    let start = ctx.patient.dialysis_start_date?;
    if now - start <= Duration::days(config.vaccination_after_days) {
        return None;
    }
    Some(AlertDraft {
        alert_type: AlertType::Vaccination,
        severity: AlertSeverity::Info,
        title: "Hepatitis B vaccination missing".to_string(),
        description: format!(
            "No hepatitis B vaccination recorded since dialysis start on {}",
            start.format("%Y-%m-%d")
        ),
        due_date: None,
    })
}

pub fn vascular_access(
    ctx: &RuleContext,
    config: &RuleConfig,
    now: DateTime<Utc>,
) -> Option<AlertDraft> {
    let (access, control) = ctx
        .accesses
        .iter()
        .filter_map(|a| a.next_control_date.map(|d| (a, d)))
        .min_by_key(|(_, d)| *d)?;
    let severity = due_severity(control, now, config.access_window_days)?;
    Some(AlertDraft {
        alert_type: AlertType::VascularAccess,
        severity,
        title: "Vascular access control due".to_string(),
        description: format!(
            "{} control scheduled for {}",
            access.access_type,
            control.format("%Y-%m-%d")
        ),
        due_date: Some(control),
    })
}

pub fn serology_update(
    ctx: &RuleContext,
    config: &RuleConfig,
    now: DateTime<Utc>,
) -> Option<AlertDraft> {
    let interval = Duration::days(config.serology_interval_days);
    match ctx.patient.serology_last_update {
        Some(last) if now - last <= interval => None,
        Some(last) => Some(AlertDraft {
            alert_type: AlertType::SerologyUpdate,
            severity: AlertSeverity::Warning,
            title: "Serology re-test due".to_string(),
            description: format!("Serology last updated on {}", last.format("%Y-%m-%d")),
            due_date: Some(last + interval),
        }),
        None => Some(AlertDraft {
            alert_type: AlertType::SerologyUpdate,
            severity: AlertSeverity::Warning,
            title: "Serology re-test due".to_string(),
            description: "No serology on record".to_string(),
            due_date: None,
        }),
    }
}

pub fn weight_deviation(
    ctx: &RuleContext,
    config: &RuleConfig,
    _now: DateTime<Utc>,
) -> Option<AlertDraft> {
    let dry = ctx.patient.dry_weight_kg?;
    let latest = ctx.latest_weight_kg?;
    let deviation = latest - dry;
    if deviation.abs() <= config.weight_tolerance_kg {
        return None;
    }
    Some(AlertDraft {
        alert_type: AlertType::WeightDeviation,
        severity: AlertSeverity::Critical,
        title: "Abnormal weight deviation".to_string(),
        description: format!(
            "Latest weight {:.1} kg deviates {:+.1} kg from dry weight {:.1} kg",
            latest, deviation, dry
        ),
        due_date: None,
    })
}

/// Evaluate all six rules for one patient
pub fn evaluate_all(
    ctx: &RuleContext,
    config: &RuleConfig,
    now: DateTime<Utc>,
) -> Vec<AlertDraft> {
    [
        prescription_renewal(ctx, config, now),
        lab_due(ctx, config, now),
        vaccination(ctx, config, now),
        vascular_access(ctx, config, now),
        serology_update(ctx, config, now),
        weight_deviation(ctx, config, now),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn patient() -> PatientProfile {
        PatientProfile {
            id: Uuid::new_v4(),
            dry_weight_kg: None,
            requires_isolation: false,
            hepatitis_b_vaccinated: true,
            dialysis_start_date: None,
            serology_last_update: Some(Utc::now()),
        }
    }

    fn ctx<'a>(
        patient: &'a PatientProfile,
        prescriptions: &'a [PrescriptionInfo],
        accesses: &'a [VascularAccessInfo],
    ) -> RuleContext<'a> {
        RuleContext {
            patient,
            prescriptions,
            last_lab_date: Some(Utc::now()),
            accesses,
            latest_weight_kg: None,
        }
    }

    #[test]
    fn test_prescription_past_due_is_critical() {
        let now = Utc::now();
        let p = patient();
        let prescriptions = [PrescriptionInfo {
            patient_id: p.id,
            active: true,
            end_date: Some(now - Duration::days(3)),
        }];
        let draft = prescription_renewal(&ctx(&p, &prescriptions, &[]), &RuleConfig::default(), now)
            .unwrap();
        assert_eq!(draft.severity, AlertSeverity::Critical);
        assert_eq!(draft.alert_type, AlertType::PrescriptionRenewal);
    }

    #[test]
    fn test_prescription_in_window_is_warning() {
        let now = Utc::now();
        let p = patient();
        let prescriptions = [PrescriptionInfo {
            patient_id: p.id,
            active: true,
            end_date: Some(now + Duration::days(10)),
        }];
        let draft = prescription_renewal(&ctx(&p, &prescriptions, &[]), &RuleConfig::default(), now)
            .unwrap();
        assert_eq!(draft.severity, AlertSeverity::Warning);
    }

    #[test]
    fn test_prescription_outside_window_is_quiet() {
        let now = Utc::now();
        let p = patient();
        let prescriptions = [PrescriptionInfo {
            patient_id: p.id,
            active: true,
            end_date: Some(now + Duration::days(60)),
        }];
        assert!(
            prescription_renewal(&ctx(&p, &prescriptions, &[]), &RuleConfig::default(), now)
                .is_none()
        );
    }

    #[test]
    fn test_inactive_prescription_ignored() {
        let now = Utc::now();
        let p = patient();
        let prescriptions = [PrescriptionInfo {
            patient_id: p.id,
            active: false,
            end_date: Some(now - Duration::days(30)),
        }];
        assert!(
            prescription_renewal(&ctx(&p, &prescriptions, &[]), &RuleConfig::default(), now)
                .is_none()
        );
    }

    #[test]
    fn test_lab_due_after_interval() {
        let now = Utc::now();
        let p = patient();
        let mut c = ctx(&p, &[], &[]);
        c.last_lab_date = Some(now - Duration::days(120));
        let draft = lab_due(&c, &RuleConfig::default(), now).unwrap();
        assert_eq!(draft.severity, AlertSeverity::Warning);
        assert!(draft.due_date.is_some());

        c.last_lab_date = Some(now - Duration::days(10));
        assert!(lab_due(&c, &RuleConfig::default(), now).is_none());
    }

    #[test]
    fn test_lab_due_with_no_lab_on_file() {
        let now = Utc::now();
        let p = patient();
        let mut c = ctx(&p, &[], &[]);
        c.last_lab_date = None;
        assert!(lab_due(&c, &RuleConfig::default(), now).is_some());
    }

    #[test]
    fn test_vaccination_gap_after_threshold() {
        let now = Utc::now();
        let mut p = patient();
        p.hepatitis_b_vaccinated = false;
        p.dialysis_start_date = Some(now - Duration::days(200));
        let draft = vaccination(&ctx(&p, &[], &[]), &RuleConfig::default(), now).unwrap();
        assert_eq!(draft.severity, AlertSeverity::Info);

        // Recently started patients are not nagged yet
        p.dialysis_start_date = Some(now - Duration::days(30));
        assert!(vaccination(&ctx(&p, &[], &[]), &RuleConfig::default(), now).is_none());

        // Vaccinated patients never fire
        p.hepatitis_b_vaccinated = true;
        p.dialysis_start_date = Some(now - Duration::days(200));
        assert!(vaccination(&ctx(&p, &[], &[]), &RuleConfig::default(), now).is_none());
    }

    #[test]
    fn test_vascular_access_past_due_is_critical() {
        let now = Utc::now();
        let p = patient();
        let accesses = [VascularAccessInfo {
            patient_id: p.id,
            access_type: "AV fistula".to_string(),
            next_control_date: Some(now - Duration::days(5)),
        }];
        let draft =
            vascular_access(&ctx(&p, &[], &accesses), &RuleConfig::default(), now).unwrap();
        assert_eq!(draft.severity, AlertSeverity::Critical);
        assert!(draft.description.contains("AV fistula"));
    }

    #[test]
    fn test_vascular_access_earliest_control_wins() {
        let now = Utc::now();
        let p = patient();
        let accesses = [
            VascularAccessInfo {
                patient_id: p.id,
                access_type: "tunneled catheter".to_string(),
                next_control_date: Some(now + Duration::days(20)),
            },
            VascularAccessInfo {
                patient_id: p.id,
                access_type: "AV fistula".to_string(),
                next_control_date: Some(now + Duration::days(5)),
            },
        ];
        let draft =
            vascular_access(&ctx(&p, &[], &accesses), &RuleConfig::default(), now).unwrap();
        assert_eq!(draft.severity, AlertSeverity::Warning);
        assert!(draft.description.contains("AV fistula"));
    }

    #[test]
    fn test_serology_stale() {
        let now = Utc::now();
        let mut p = patient();
        p.serology_last_update = Some(now - Duration::days(300));
        let draft = serology_update(&ctx(&p, &[], &[]), &RuleConfig::default(), now).unwrap();
        assert_eq!(draft.alert_type, AlertType::SerologyUpdate);

        p.serology_last_update = Some(now - Duration::days(30));
        assert!(serology_update(&ctx(&p, &[], &[]), &RuleConfig::default(), now).is_none());
    }

    #[test]
    fn test_weight_deviation_beyond_tolerance_is_critical() {
        let now = Utc::now();
        let mut p = patient();
        p.dry_weight_kg = Some(70.0);
        let mut c = ctx(&p, &[], &[]);
        c.latest_weight_kg = Some(76.0);
        let draft = weight_deviation(&c, &RuleConfig::default(), now).unwrap();
        assert_eq!(draft.severity, AlertSeverity::Critical);
        assert!(draft.description.contains("+6.0"));
    }

    #[test]
    fn test_weight_within_tolerance_is_quiet() {
        let now = Utc::now();
        let mut p = patient();
        p.dry_weight_kg = Some(70.0);
        let mut c = ctx(&p, &[], &[]);
        c.latest_weight_kg = Some(71.5);
        assert!(weight_deviation(&c, &RuleConfig::default(), now).is_none());

        // Loss beyond tolerance also fires
        c.latest_weight_kg = Some(67.0);
        assert!(weight_deviation(&c, &RuleConfig::default(), now).is_some());
    }

    #[test]
    fn test_weight_rule_needs_both_values() {
        let now = Utc::now();
        let p = patient();
        let mut c = ctx(&p, &[], &[]);
        c.latest_weight_kg = Some(76.0);
        assert!(weight_deviation(&c, &RuleConfig::default(), now).is_none());
    }

    #[test]
    fn test_evaluate_all_collects_fired_rules() {
        let now = Utc::now();
        let mut p = patient();
        p.dry_weight_kg = Some(70.0);
        p.serology_last_update = Some(now - Duration::days(300));
        let mut c = ctx(&p, &[], &[]);
        c.latest_weight_kg = Some(76.0);
        let drafts = evaluate_all(&c, &RuleConfig::default(), now);
        let types: Vec<AlertType> = drafts.iter().map(|d| d.alert_type).collect();
        assert!(types.contains(&AlertType::SerologyUpdate));
        assert!(types.contains(&AlertType::WeightDeviation));
        assert!(!types.contains(&AlertType::PrescriptionRenewal));
    }
}
