//! Session Lifecycle
//!
//! Drives a dialysis session through its bounded set of clinical states
//! (scheduled → checked_in → in_progress → completed, with cancellation and
//! no-show exits) and records phase-tagged vitals and adverse events while
//! the session is in progress.

mod error;
mod manager;
mod vitals;

pub use error::LifecycleError;
pub use manager::{IncidentDraft, PatientDirectory, ScheduleRequest, SessionManager};
pub use vitals::{VitalsConfig, VitalsError, VitalsValidator};
