//! Alert Lifecycle Manager
//!
//! active → acknowledged → resolved, or active → resolved directly, or
//! active → dismissed. Nothing leaves resolved or dismissed; alerts are
//! retained for audit, never deleted.

use crate::AlertError;
use chrono::Utc;
use std::sync::Arc;
use storage::{AlertStatus, ClinicalAlert, Repository};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct AlertLifecycle {
    repository: Arc<Repository>,
}

fn guard(
    alert: &ClinicalAlert,
    expected: &[AlertStatus],
    attempted: &'static str,
) -> Result<(), AlertError> {
    if !expected.contains(&alert.status) {
        return Err(AlertError::InvalidAlertTransition {
            from: alert.status,
            attempted,
        });
    }
    Ok(())
}

impl AlertLifecycle {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// active → acknowledged
    pub fn acknowledge(&self, alert_id: Uuid) -> Result<ClinicalAlert, AlertError> {
        self.repository.with_alert_mut(alert_id, |alert| {
            guard(alert, &[AlertStatus::Active], "acknowledge")?;
            alert.status = AlertStatus::Acknowledged;
            alert.acknowledged_at = Some(Utc::now());
            info!("Alert {} acknowledged", alert.id);
            Ok(alert.clone())
        })
    }

    /// {active, acknowledged} → resolved
    pub fn resolve(
        &self,
        alert_id: Uuid,
        notes: Option<&str>,
    ) -> Result<ClinicalAlert, AlertError> {
        self.repository.with_alert_mut(alert_id, |alert| {
            guard(
                alert,
                &[AlertStatus::Active, AlertStatus::Acknowledged],
                "resolve",
            )?;
            alert.status = AlertStatus::Resolved;
            alert.resolved_at = Some(Utc::now());
            alert.resolution_notes = notes.map(str::to_string);
            info!("Alert {} resolved", alert.id);
            Ok(alert.clone())
        })
    }

    /// active → dismissed
    pub fn dismiss(&self, alert_id: Uuid) -> Result<ClinicalAlert, AlertError> {
        self.repository.with_alert_mut(alert_id, |alert| {
            guard(alert, &[AlertStatus::Active], "dismiss")?;
            alert.status = AlertStatus::Dismissed;
            info!("Alert {} dismissed", alert.id);
            Ok(alert.clone())
        })
    }
}
