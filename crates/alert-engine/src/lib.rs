//! Alert Engine
//!
//! Deterministic, data-driven rules that scan patient clinical state and
//! emit actionable alerts (renewals, lab due-dates, vaccination gaps,
//! vascular-access controls, stale serology, weight deviation), plus the
//! lifecycle governing each alert from active to resolved.

mod engine;
mod lifecycle;
mod provider;
mod rules;

pub use engine::{AlertEngine, GenerationSummary};
pub use lifecycle::AlertLifecycle;
pub use provider::{
    ClinicalDataProvider, InMemoryClinicalData, PatientProfile, PrescriptionInfo,
    VascularAccessInfo,
};
pub use rules::{AlertDraft, RuleConfig, RuleContext};

use storage::{AlertStatus, StorageError};
use thiserror::Error;

/// Alert engine and lifecycle errors
#[derive(Debug, Error)]
pub enum AlertError {
    /// The alert's current status does not allow the attempted operation
    #[error("Cannot {attempted} an alert that is {from}")]
    InvalidAlertTransition {
        from: AlertStatus,
        attempted: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
